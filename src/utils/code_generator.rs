use rand::Rng;

/// Six-digit numeric code, uniform over 100000..=999999.
pub fn generate_six_digit_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999).to_string()
}
