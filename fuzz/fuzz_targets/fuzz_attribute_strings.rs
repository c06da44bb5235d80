#![no_main]

use fweb_dom::ClassUpdate;
use fweb_dom::attrs::{parse_props, parse_style};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse_props(data);
    let _ = parse_style(data);

    let mut classes = Vec::new();
    ClassUpdate::add(data).apply(&mut classes);
    ClassUpdate::toggle(data).apply(&mut classes);
    assert!(classes.iter().all(|c| !c.is_empty() && !c.contains(char::is_whitespace)));
});
