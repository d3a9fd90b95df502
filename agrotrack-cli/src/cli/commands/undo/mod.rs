//! `agrotrack undo`

pub mod handler;

use clap::Args;

#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
