//! Generate seed corpus for fuzzing

use cabin_rs::Archive;
use std::fs;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_directory_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty archive (bare trailer)
    {
        let path = format!("{}/seed_empty.cabin", corpus_dir);
        fs::remove_file(&path).ok();
        Archive::open(&path)?.close()?;
        println!("Generated: {}", path);
    }

    // Seed 2: Single small file
    {
        let path = format!("{}/seed_single_small.cabin", corpus_dir);
        fs::remove_file(&path).ok();
        let mut archive = Archive::open(&path)?;
        archive.write_file("test.txt", b"Hello, World!")?;
        archive.close()?;
        println!("Generated: {}", path);
    }

    // Seed 3: Streamed and mapped entries with dead space
    {
        let path = format!("{}/seed_mixed.cabin", corpus_dir);
        fs::remove_file(&path).ok();
        let mut archive = Archive::open(&path)?;
        archive.write_file("file1.txt", b"First file")?;
        archive.write_file("dir/file2.txt", b"Second file")?;
        archive.write_file("file1.txt", b"First file, rewritten")?;

        let mut view = archive.direct_write("fixed.bin", 64)?;
        view.write_all(&[0x5A; 64])?;
        view.release()?;

        archive.delete("dir/file2.txt")?;
        archive.close()?;
        println!("Generated: {}", path);
    }

    println!("\nSeed corpus generated in {}", corpus_dir);
    Ok(())
}
