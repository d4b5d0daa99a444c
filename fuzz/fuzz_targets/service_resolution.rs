#![no_main]

use libfuzzer_sys::fuzz_target;
use wirebox::{BoxError, ContainerBuilder, DiError, Resolver, ServiceDefinition};

const KEYS: usize = 8;

fn name(byte: u8) -> String {
    format!("k{}", byte as usize % (KEYS + 2))
}

// Each 3-byte chunk declares one service: key, dependency bitmask, flags.
// Keys k8 and k9 are never registered, so inputs exercise missing
// dependencies, cycles and async kinds together.
fuzz_target!(|data: &[u8]| {
    let mut builder = ContainerBuilder::new();
    for chunk in data.chunks_exact(3).take(32) {
        let key = format!("k{}", chunk[0] as usize % KEYS);
        let deps: Vec<String> = (0..KEYS as u8 + 2)
            .filter(|bit| (u16::from(chunk[1]) << 2 | u16::from(chunk[2] & 0b11)) & (1 << bit) != 0)
            .map(name)
            .collect();

        let def = if chunk[2] & 0b100 != 0 {
            ServiceDefinition::async_factory(key, deps, |_| async { Ok::<_, BoxError>(()) })
        } else {
            ServiceDefinition::factory(key, deps, |_| Ok::<_, BoxError>(()))
        };
        builder = builder.add_definition(def);
    }

    let Ok(container) = builder.build() else { return };

    for i in 0..KEYS as u8 + 2 {
        let key = name(i);
        let checked = container.test(key.as_str());
        let checked_sync = container.test_sync(key.as_str());

        match container.get_sync::<()>(key.as_str()) {
            Ok(_) => assert!(checked_sync),
            Err(DiError::AsyncRequired { .. }) => assert!(checked && !checked_sync),
            Err(_) => assert!(!checked_sync),
        }

        let outcome = futures::executor::block_on(container.get::<()>(key.as_str()));
        assert_eq!(outcome.is_ok(), checked);
    }

    futures::executor::block_on(container.close()).unwrap();
});
