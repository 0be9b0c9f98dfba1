use tracing::{debug, info, warn};

use crate::app::EpicContext;
use crate::settings::actions::ModelsAction;
use crate::settings::models::FunctionStatus;

/// Side effects of the models slice: catalog loading and application deployment.
pub fn handle(ctx: &EpicContext, action: &ModelsAction) {
    match action {
        ModelsAction::GetModels => get_models(ctx),
        ModelsAction::GetModelsSuccess { models } => {
            for model in models {
                if let Some(status) = model.function_status.filter(FunctionStatus::is_terminal) {
                    if ctx.is_polling(&model.id) {
                        ctx.dispatch(ModelsAction::FunctionStatusTerminal {
                            id: model.id.clone(),
                            status,
                        });
                    }
                }
            }
        }
        ModelsAction::Deploy { id } => change_deployment(ctx, id.clone(), true),
        ModelsAction::Undeploy { id } => change_deployment(ctx, id.clone(), false),
        ModelsAction::FunctionStatusTerminal { id, status } => {
            info!(application = %id, status = ?status, "Deployment settled");
            ctx.stop_poll(id);
        }
        ModelsAction::GetModelsFail { .. }
        | ModelsAction::InitLocalModels { .. }
        | ModelsAction::UpdateRecentModels { .. }
        | ModelsAction::AddInstalledModels { .. }
        | ModelsAction::RemoveInstalledModels { .. }
        | ModelsAction::UpdateFunctionStatus { .. } => {}
    }
}

fn get_models(ctx: &EpicContext) {
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().models.list_models().await {
            Ok(models) => {
                debug!(count = models.len(), "Loaded models");
                ctx.dispatch(ModelsAction::GetModelsSuccess { models });
            }
            Err(e) => {
                warn!(error = ?e, "Failed to load models");
                if e.is_unauthorized() {
                    ctx.auth_required();
                }
                ctx.dispatch(ModelsAction::GetModelsFail {
                    message: e.to_string(),
                    unauthorized: e.is_unauthorized(),
                });
            }
        }
    });
}

fn change_deployment(ctx: &EpicContext, id: String, deploy: bool) {
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let models = &ctx.services().models;
        let result = if deploy {
            models.deploy(&id).await
        } else {
            models.undeploy(&id).await
        };

        match result {
            Ok(()) => poll_function_status(ctx, id, deploy).await,
            Err(e) => {
                warn!(application = %id, error = ?e, "Deployment request failed");
                if e.is_unauthorized() {
                    ctx.auth_required();
                }
                let verb = if deploy { "deploy" } else { "undeploy" };
                ctx.notify_error(format!("Failed to {verb} application {id}"));
                ctx.dispatch(ModelsAction::FunctionStatusTerminal {
                    id,
                    status: FunctionStatus::Failed,
                });
            }
        }
    });
}

/// Re-read the catalog until `id` reaches a terminal status, disappears, or the
/// attempt budget runs out. Cancelled when a terminal status is observed elsewhere.
async fn poll_function_status(ctx: EpicContext, id: String, deploy: bool) {
    let token = ctx.start_poll(&id);
    let interval = ctx.config().deploy_poll_interval();
    let max_attempts = ctx.config().max_poll_attempts;
    let mut attempts: u32 = 0;
    let mut last_status = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(application = %id, "Deployment poll cancelled");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
        attempts += 1;

        match ctx.services().models.list_models().await {
            Ok(models) => {
                let Some(model) = models.iter().find(|m| m.id == id) else {
                    warn!(application = %id, "Application disappeared while polling");
                    ctx.notify_error(format!("Application {id} is no longer available"));
                    ctx.dispatch(ModelsAction::FunctionStatusTerminal {
                        id,
                        status: FunctionStatus::Failed,
                    });
                    return;
                };
                if let Some(status) = model.function_status {
                    if status.is_terminal() {
                        if status == FunctionStatus::Failed {
                            let verb = if deploy { "deploy" } else { "undeploy" };
                            ctx.notify_error(format!("Failed to {verb} application {id}"));
                        }
                        ctx.dispatch(ModelsAction::FunctionStatusTerminal { id, status });
                        return;
                    }
                    if last_status != Some(status) {
                        last_status = Some(status);
                        ctx.dispatch(ModelsAction::UpdateFunctionStatus {
                            id: id.clone(),
                            status,
                        });
                    }
                }
            }
            Err(e) => warn!(application = %id, attempt = attempts, error = ?e, "Deployment poll failed"),
        }

        if max_attempts.is_some_and(|max| attempts >= max) {
            warn!(application = %id, attempts, "Deployment poll gave up");
            ctx.notify_error(format!("Application {id} status is unknown"));
            ctx.dispatch(ModelsAction::FunctionStatusTerminal {
                id,
                status: FunctionStatus::Failed,
            });
            return;
        }
    }
}
