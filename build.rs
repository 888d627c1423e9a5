//! Renders the `burrow` manual pages into `OUT_DIR`.
//!
//! Release tarballs ship `burrow.1` plus one `burrow-<verb>.1` per lifecycle
//! subcommand. All of them come from the clap definitions the binary parses
//! with, so flags documented in the manual cannot drift from the CLI.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

const WATCHED: [&str; 2] = ["build.rs", "src/cli/mod.rs"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    for path in WATCHED {
        writeln!(stdout, "cargo:rerun-if-changed={path}")?;
    }

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))?;

    let command = cli::Cli::command();
    write_page(&out_dir, "burrow", &Man::new(command.clone()))?;
    for verb in command.get_subcommands() {
        let title = format!("burrow-{}", verb.get_name());
        let page = Man::new(verb.clone()).title(title.clone());
        write_page(&out_dir, &title, &page)?;
    }
    Ok(())
}

fn write_page(out_dir: &Path, title: &str, page: &Man) -> io::Result<()> {
    let mut rendered = Vec::new();
    page.render(&mut rendered)?;
    fs::write(out_dir.join(format!("{title}.1")), rendered)
}
