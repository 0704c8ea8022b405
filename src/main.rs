use anyhow::Context;
use std::{thread, time::Duration};

use xtouch_mini::{midi, XTouchMini};

const DEVICE_KEYWORD: &str = "X-TOUCH MINI";

fn run() -> anyhow::Result<()> {
    let ports = midi::port::Ports::list(xtouch_mini::APPLICATION_NAME)?;
    for name in ports.ins.iter() {
        log::debug!("In port: {name}");
    }
    for name in ports.outs.iter() {
        log::debug!("Out port: {name}");
    }

    let (input, output) = ports
        .find_device(DEVICE_KEYWORD)
        .with_context(|| format!("No '{DEVICE_KEYWORD}' device found"))?;

    let transport = midi::Midir::new(xtouch_mini::APPLICATION_NAME);
    let mut deck = XTouchMini::open(transport, &output, &input)?;
    deck.set_sink(|event: xtouch_mini::Event| println!(">> {event}"));
    deck.start()?;

    deck.self_test();

    log::info!("Listening for 10s, play with the controls");
    thread::sleep(Duration::from_secs(10));

    deck.stop();

    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    match run() {
        Ok(()) => log::info!("Exiting"),
        Err(err) => {
            log::error!("Error: {err}");
            for source in err.chain().skip(1) {
                log::error!("\t{source}");
            }
        }
    }
}
