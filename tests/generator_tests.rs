use lockbox::cryptography::generator::{
    CharsetGenerator, GeneratorConfig, GeneratorError, PasswordGenerator, MIN_LENGTH,
};
use lockbox::cryptography::random::SystemRng;
use std::sync::Arc;

const SPECIAL: &str = "!@#$%^&*()-_=+[]{}|;:,.<>?";

fn config_from_mask(mask: u8) -> GeneratorConfig {
    GeneratorConfig {
        lowercase: mask & 1 != 0,
        uppercase: mask & 2 != 0,
        digits: mask & 4 != 0,
        special: mask & 8 != 0,
        avoid_ambiguous: false,
    }
}

#[test]
fn every_enabled_category_appears_at_every_length() {
    for mask in 1u8..16 {
        let cfg = config_from_mask(mask);
        let gen = CharsetGenerator::new(Arc::new(SystemRng), cfg);
        for length in MIN_LENGTH..=40 {
            let s = gen.generate(length).unwrap();
            assert_eq!(s.chars().count(), length, "mask {mask:04b}");
            assert_eq!(s.chars().any(|c| c.is_ascii_lowercase()), cfg.lowercase, "{s}");
            assert_eq!(s.chars().any(|c| c.is_ascii_uppercase()), cfg.uppercase, "{s}");
            assert_eq!(s.chars().any(|c| c.is_ascii_digit()), cfg.digits, "{s}");
            assert_eq!(s.chars().any(|c| SPECIAL.contains(c)), cfg.special, "{s}");
        }
    }
}

#[test]
fn error_laws() {
    let all = CharsetGenerator::new(Arc::new(SystemRng), GeneratorConfig::default());
    assert_eq!(all.generate(3), Err(GeneratorError::InvalidLength(3)));

    let none = CharsetGenerator::new(Arc::new(SystemRng), config_from_mask(0));
    assert_eq!(none.generate(8), Err(GeneratorError::NoCategorySelected));
}

#[test]
fn long_passwords_draw_from_the_whole_pool() {
    let gen = CharsetGenerator::new(Arc::new(SystemRng), config_from_mask(4));
    let s = gen.generate(2_000).unwrap();
    for d in '0'..='9' {
        assert!(s.contains(d), "digit {d} never drawn");
    }
}
