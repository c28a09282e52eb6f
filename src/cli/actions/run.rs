use super::Action;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<()> {
    match action {
        Action::Monitor {
            endpoints,
            interval,
            listen,
            port,
            probe,
        } => crate::exporter::start(endpoints, interval, listen, port, probe).await,
    }
}
