//! Prints the genesis block hash for a network, without touching disk.
//!
//! A thin command-line face on `mvs_chain::parameters::genesis_hash`/
//! `genesis_block`: no store, no network connection, just the constants.

use structopt::StructOpt;

use mvs_chain::parameters::{genesis_block, genesis_hash, Network};

#[derive(StructOpt)]
#[structopt(about = "Print the genesis block hash for a network")]
struct Opt {
    /// Which network's genesis block to hash.
    #[structopt(long, default_value = "mainnet", possible_values = &["mainnet", "testnet"])]
    network: String,

    /// Also print the full genesis block, as JSON.
    #[structopt(long)]
    dump_block: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();

    let network = match opt.network.as_str() {
        "mainnet" => Network::Mainnet,
        "testnet" => Network::Testnet,
        other => color_eyre::eyre::bail!("unrecognized network {:?}", other),
    };

    println!("{}", genesis_hash(network));

    if opt.dump_block {
        let block = genesis_block(network);
        println!("{:#?}", block.header);
    }

    Ok(())
}
