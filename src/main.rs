use lambda_runtime::{run, service_fn, Error, LambdaEvent};

mod config;
mod connection;
mod document_store;
mod error;
mod handler;
mod kv_store;
mod logging;

use config::Settings;
use handler::{function_handler, AppState, GreetRequest};
use logging::{init_logging, log_invocation};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    // Slots start empty; connections are opened by the first invocation that needs them
    let state = AppState::new(Settings::from_env());
    let state = &state;

    run(service_fn(move |event: LambdaEvent<GreetRequest>| async move {
        let request = event.payload;
        let result = log_invocation(&request, function_handler(state, request.clone())).await;
        if result.is_err() {
            state.log_slot_status().await;
        }
        result.map_err(Error::from)
    }))
    .await
}
