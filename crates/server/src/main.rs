use std::net::SocketAddr;
use std::sync::Arc;

use alerter::Alerter;
use config::Config;
use db::InMemoryRepository;
use delete::{DeleteService, LapinDeleteQueue, Reconciler};
use events::EventBus;
use execution::{ExecutionCallbacks, ExecutionRunner, TimerRegistry};
use scheduler::Scheduler;
use server::routes::router;
use server::state::AppState;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = Config::load().map_err(|err| anyhow::anyhow!(err.to_string()))?;

    let repo = Arc::new(InMemoryRepository::new()) as Arc<dyn db::Repository>;
    let bus = Arc::new(EventBus::new(config.event_bus_buffer));
    let timers = Arc::new(TimerRegistry::default());
    let runner = Arc::new(ExecutionRunner::new(repo.clone(), bus.clone(), timers.clone()));
    let callbacks = Arc::new(ExecutionCallbacks::new(repo.clone(), bus.clone(), timers.clone()));

    let scheduler = Scheduler::new(repo.clone(), bus.clone(), runner.clone()).await?;
    scheduler.rehydrate().await?;
    tokio::spawn(scheduler.clone().run_event_loop());

    let queue = Arc::new(LapinDeleteQueue::connect(&config.broker.amqp_url, &config.broker.delete_queue_name).await?);
    let delete_service = Arc::new(DeleteService::new(repo.clone(), bus.clone(), queue.clone(), scheduler.clone()));
    tokio::spawn(delete_service.clone().run_worker());

    let reconciler = Arc::new(Reconciler::new(
        repo.clone(),
        queue.clone(),
        config.broker.reconciler_interval,
        config.broker.reconciler_threshold,
    ));
    let reconciler_cancel = CancellationToken::new();
    tokio::spawn(reconciler.run(reconciler_cancel.clone()));

    let alerter = Alerter::from_config(repo.clone(), &config.alerting);
    alerter.spawn(&bus);

    let state = AppState {
        repo,
        bus,
        scheduler,
        runner,
        callbacks,
        delete_service,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router(state).into_make_service()).await?;

    reconciler_cancel.cancel();
    Ok(())
}
