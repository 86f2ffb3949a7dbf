use crate::markers::catalog;
use anyhow::Result;

pub fn run() -> Result<()> {
    println!("{:<10} {:<6} {:<26} {}", "MARKER", "MOTIF", "SEQ1", "SEQ2");
    for marker in catalog() {
        println!("{:<10} {:<6} {:<26} {}", marker.name, marker.motif, marker.seq1, marker.seq2);
    }
    Ok(())
}
