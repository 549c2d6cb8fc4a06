/// Basic example demonstrating streaming writes and reads
///
/// Run with: cargo run --example basic
use anyhow::Result;
use cabin_rs::Archive;
use std::io::{Read, Write};

fn main() -> Result<()> {
    println!("=== Cabin-rs Basic Example ===\n");

    println!("1. Writing archive...");
    create_archive()?;

    println!("\n2. Reading from archive...");
    read_archive()?;

    std::fs::remove_file("example_basic.cabin")?;
    println!("\nExample complete!");
    Ok(())
}

fn create_archive() -> Result<()> {
    let mut archive = Archive::open("example_basic.cabin")?;

    archive.write_file("readme.txt", b"This is a readme file for the basic example.")?;
    archive.write_file("notes.md", b"# Notes\n\nThis is a markdown file.")?;

    // Streaming writers don't need to know the length up front
    let mut writer = archive.open_writer("numbers.csv")?;
    for i in 0..100 {
        writeln!(writer, "{},{}", i, i * i)?;
    }
    let entry = writer.close()?;
    drop(writer);
    println!("   numbers.csv: {} bytes at offset {}", entry.length, entry.offset);

    archive.close()?;
    println!("   Archive written: example_basic.cabin");
    Ok(())
}

fn read_archive() -> Result<()> {
    let archive = Archive::open("example_basic.cabin")?;

    println!("   Files in archive:");
    for entry in archive.entries() {
        println!("     - {} ({} bytes)", entry.path, entry.length);
    }

    let mut text = String::new();
    archive.open_reader("readme.txt")?.read_to_string(&mut text)?;
    println!("\n   readme.txt: {}", text);

    archive.close()?;
    Ok(())
}
