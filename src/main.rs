use timnet_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // logging is not up yet if the config was the problem, so go to stderr
    if let Err(e) = timnet_bridge::app(options).await {
        eprintln!("Application error: {:?}", e);
        std::process::exit(255);
    }

    Ok(())
}
