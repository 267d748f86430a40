use azure_site_list::auth::{ConfiguredAuthenticator, TokenCache};
use azure_site_list::azure::ManagementClient;
use azure_site_list::config::Config;
use azure_site_list::list_all_sites;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    if let Err(e) = log4rs::init_file("log4rs.yml", Default::default()) {
        eprintln!("log4rs.yml not loaded, logging disabled: {e}");
    }
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let config = Config::from_env()?;
    let client = ManagementClient::from_config(&config);
    let authenticator = ConfiguredAuthenticator::from_config(&config);
    let mut cache = TokenCache::new();
    let mut out = std::io::stdout();

    // Failures are printed, the exit code stays 0.
    if let Err(e) = list_all_sites(&config, &client, &authenticator, &mut cache, &mut out).await {
        log::error!("Run failed: {e}");
        println!("{e}");
    }

    Ok(())
}
