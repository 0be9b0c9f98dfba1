use super::models::{FunctionStatus, Model};

#[derive(Debug, Clone)]
pub enum ModelsAction {
    GetModels,
    GetModelsSuccess {
        models: Vec<Model>,
    },
    GetModelsFail {
        message: String,
        unauthorized: bool,
    },
    /// Recent/installed lists restored from local settings.
    InitLocalModels {
        recent: Vec<String>,
        installed: Vec<String>,
    },
    UpdateRecentModels {
        model_id: String,
    },
    AddInstalledModels {
        ids: Vec<String>,
    },
    RemoveInstalledModels {
        ids: Vec<String>,
    },
    Deploy {
        id: String,
    },
    Undeploy {
        id: String,
    },
    UpdateFunctionStatus {
        id: String,
        status: FunctionStatus,
    },
    /// A terminal status was observed for `id`; any poll for it stops.
    FunctionStatusTerminal {
        id: String,
        status: FunctionStatus,
    },
}
