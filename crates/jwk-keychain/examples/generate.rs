/*!
*   Generates a key chain from a descriptor and writes the serialized chain to a file.
*
*   Without a descriptor file, a default chain is generated:
*   token.sig (RS256), id_token.sig (RS256) and userinfo.enc (ES256).
*/

use std::fs;

use clap::Parser;
use jwk_keychain::{Descriptor, KeyChain, KeyChainConfigBuilder, LeafSpec, errors::Result};
use tracing_subscriber::filter;

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Descriptor JSON file
    #[arg(short, long)]
    descriptor: Option<String>,

    /// Where to write the serialized key chain
    #[arg(short, long, default_value = "keychain.json")]
    output: String,

    /// Random bytes per key ID
    #[arg(short, long, default_value_t = 8)]
    kid_length: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // construct a subscriber that prints formatted traces to stdout
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Logging failed, exiting...");

    let descriptor = match &args.descriptor {
        Some(path) => fs::read_to_string(path)
            .expect("Couldn't read descriptor file")
            .parse()?,
        None => {
            let sig = LeafSpec::new("RS256").with_modulus_length(2048);
            Descriptor::new()
                .with_node("token", Descriptor::new().with_leaf("sig", sig.clone()))
                .with_node("id_token", Descriptor::new().with_leaf("sig", sig))
                .with_node(
                    "userinfo",
                    Descriptor::new().with_leaf("enc", LeafSpec::new("ES256")),
                )
        }
    };

    let config = KeyChainConfigBuilder::default()
        .with_kid_length(args.kid_length)
        .build();

    let chain = KeyChain::generate(descriptor, config).await?;

    fs::write(&args.output, serde_json::to_string_pretty(&chain)?)
        .expect("Couldn't write key chain");

    println!("Key chain written to {}", args.output);
    println!();
    println!("JWK Set");
    println!("=======");
    println!("{}", serde_json::to_string_pretty(chain.jwks())?);

    Ok(())
}
