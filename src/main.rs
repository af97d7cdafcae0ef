mod cli;
mod commands;
mod config;
mod error;
mod models;
mod server;
mod services;

fn main() {
    cli::run();
}
