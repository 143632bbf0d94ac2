#![no_main]

use hmmm_core::{
    read_image, Decoder, Image, Machine, MachineConfig, ScriptedConsole, StepOutcome,
};
use libfuzzer_sys::fuzz_target;

const STEP_LIMIT: usize = 4096;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = read_image(text);
    }

    let words: Vec<u16> = data
        .chunks_exact(2)
        .take(256)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    for &word in &words {
        let _ = Decoder::decode(word);
    }

    let image = Image::from_words(words);
    let mut machine = Machine::new(&image, MachineConfig::with_debug(false));
    let mut console = ScriptedConsole::new(["7", "-3", "x", "q"]);
    for _ in 0..STEP_LIMIT {
        match machine.step(&mut console) {
            Ok(StepOutcome::Retired) => {}
            Ok(StepOutcome::Halted) | Err(_) => break,
        }
    }
});
