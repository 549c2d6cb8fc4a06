/// Print an archive's directory as JSON
///
/// Run with: cargo run --example inspect -- path/to/archive.cabin
use anyhow::{bail, Context, Result};
use cabin_rs::DirectoryReader;

fn main() -> Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: inspect <archive>");
    };

    let reader =
        DirectoryReader::open(&path).with_context(|| format!("failed to open {}", path))?;

    let trailer = reader.trailer();
    eprintln!(
        "{}: {} entries, directory at {}",
        path, trailer.entry_count, trailer.directory_offset
    );
    println!("{}", reader.to_json()?);
    Ok(())
}
