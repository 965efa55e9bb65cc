#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// The ultimate strictness: catches things like missing documentation or overflow risks
#![warn(clippy::restriction)]

fn main() {
  if let Err(e) = alert_deck::run() {
    eprintln!("alert-deck: {}", e);
    std::process::exit(1);
  }
}
