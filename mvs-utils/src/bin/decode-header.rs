//! Decodes a hex-encoded block header and pretty-prints its fields,
//! without needing a running node or an open store.
//!
//! Grounded the same way as `genesis-hash`: a thin command-line face over
//! `mvs_chain::block::Header`'s existing `BitcoinDeserialize` impl.

use std::io::Read;

use structopt::StructOpt;

use mvs_chain::block::{Hash, Header};
use mvs_chain::BitcoinDeserialize;

#[derive(StructOpt)]
#[structopt(about = "Decode a hex-encoded block header")]
struct Opt {
    /// Hex-encoded header bytes. Reads from stdin if omitted.
    hex: Option<String>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();

    let hex_input = match opt.hex {
        Some(hex_input) => hex_input,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let bytes = hex::decode(hex_input.trim())?;
    let header = Header::bitcoin_deserialize(&bytes[..])?;

    println!("{:#?}", header);
    println!("hash: {}", Hash::from(&header));

    Ok(())
}
