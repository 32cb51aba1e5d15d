/*!
*   Restores a serialized key chain (see the `generate` example) and prints what was imported.
*/

use std::fs;

use clap::Parser;
use jwk_keychain::{KeyChain, KeyChainConfig, KeyNode, KeyTree, errors::Result};
use serde_json::Value;
use tracing_subscriber::filter;

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Serialized key chain file
    #[arg(short, long, default_value = "keychain.json")]
    input: String,
}

fn print_tree(tree: &KeyTree, indent: usize) {
    for (name, node) in tree.iter() {
        let pad = " ".repeat(indent);
        match node {
            KeyNode::Pair(entry) => println!(
                "{pad}{name}: {} pair (private: {:?}, public: {:?})",
                entry.public_jwk().alg.as_deref().unwrap_or("?"),
                entry.private_key().map(|k| k.key_type()),
                entry.public_key().map(|k| k.key_type()),
            ),
            KeyNode::Single(entry) => println!(
                "{pad}{name}: {} JWK (private: {:?}, public: {:?})",
                entry.jwk().alg.as_deref().unwrap_or("?"),
                entry.private_key().map(|k| k.key_type()),
                entry.public_key().map(|k| k.key_type()),
            ),
            KeyNode::Branch(tree) => {
                println!("{pad}{name}:");
                print_tree(tree, indent + 2);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // construct a subscriber that prints formatted traces to stdout
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Logging failed, exiting...");

    let data: Value =
        serde_json::from_str(&fs::read_to_string(&args.input).expect("Couldn't read key chain"))?;

    let chain = KeyChain::restore(&data, KeyChainConfig::default()).await?;

    println!("Restored key chain ({})", chain.state());
    print_tree(chain.keys(), 2);
    println!();
    println!("JWK Set: {}", chain.jwk_set().unwrap_or_default());

    Ok(())
}
