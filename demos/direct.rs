/// Memory-mapped writes and reads
///
/// Run with: cargo run --example direct
use anyhow::Result;
use cabin_rs::Archive;
use std::io::{Read, Seek, SeekFrom, Write};

const RECORD_SIZE: u64 = 16;
const RECORDS: u64 = 1024;

fn main() -> Result<()> {
    let path = "example_direct.cabin";

    {
        let mut archive = Archive::open(path)?;

        // Length is declared up front; the view is exactly that large
        let mut view = archive.direct_write("records.bin", RECORD_SIZE * RECORDS)?;
        for i in 0..RECORDS {
            view.write_all(&i.to_be_bytes())?;
            view.write_all(&(i * 3).to_be_bytes())?;
        }
        view.release()?;

        archive.close()?;
    }

    {
        let archive = Archive::open(path)?;
        let mut view = archive.direct_read("records.bin")?;
        view.prefetch()?;
        println!("records.bin: {} bytes, {} resident", view.len(), view.available());

        // Random access into the middle of the entry
        view.seek(SeekFrom::Start(500 * RECORD_SIZE))?;
        let mut record = [0u8; 16];
        view.read_exact(&mut record)?;
        println!("record 500 = {:?}", record);

        // Views borrow the archive; release before closing
        view.release();
        archive.close()?;
    }

    std::fs::remove_file(path)?;
    Ok(())
}
