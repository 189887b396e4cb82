//! The internet checksum (RFC 1071) as used by `ICMPv4`.

/// Calculate the checksum for an `ICMPv4` packet.
///
/// The checksum field itself (the second 16-bit word) is skipped so the
/// result can be computed over a packet whose checksum is already set.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    if data.is_empty() {
        return 0;
    }
    finalize(sum_be_words(data, 1))
}

fn sum_be_words(data: &[u8], skip_word: usize) -> u32 {
    let words = data.chunks_exact(2);
    let trailing = words.remainder().first().copied();
    let mut sum = words
        .enumerate()
        .filter(|(i, _)| *i != skip_word)
        .map(|(_, word)| u32::from(u16::from_be_bytes([word[0], word[1]])))
        .sum::<u32>();
    if let Some(byte) = trailing {
        sum += u32::from(byte) << 8;
    }
    sum
}

const fn finalize(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    !sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty() {
        assert_eq!(0, icmp_ipv4_checksum(&[]));
    }

    #[test]
    fn test_echo_request_header() {
        let bytes = hex!("08 00 00 00 04 d2 00 0a");
        assert_eq!(0xf323, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_existing_checksum_ignored() {
        let bytes = hex!("08 00 f3 23 04 d2 00 0a");
        assert_eq!(0xf323, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_odd_length_pads_trailing_byte() {
        let bytes = hex!("08 00 00 00 04 d2 00 0a ff");
        assert_eq!(0xf422, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_carry_folded() {
        let bytes = hex!("ff ff 00 00 ff ff");
        assert_eq!(0x0000, icmp_ipv4_checksum(&bytes));
    }
}
