use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match labvision_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("labvision: {e}");
            ExitCode::FAILURE
        }
    }
}
