use rand::{distributions::Uniform, prelude::Distribution, thread_rng};

const LOCAL_PART_LEN: usize = 12;
const CHARSET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Mailbox that almost certainly does not exist, used to detect catch-all domains.
pub fn generate_random_mailbox(domain: &str) -> String {
    let mut rng = thread_rng();
    let between = Uniform::from(0..CHARSET.len());

    let local_part: String = (0..LOCAL_PART_LEN)
        .map(|_| CHARSET[between.sample(&mut rng)] as char)
        .collect();

    format!("{local_part}@{domain}")
}
