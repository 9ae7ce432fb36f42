//! Fingerprint digests
//!
//! A fingerprint is a SHA-256 over a canonically ordered subset of a
//! frame's tagged elements, so it ignores both the source address and the
//! order in which the elements arrived.

use sha2::{Digest, Sha256};

use crate::wireless::ieee80211::{ElementId, TaggedElement};

/// HT capabilities, extended capabilities, vendor specific
pub const STABLE_IDS: [u8; 3] = [
    ElementId::HtCapabilities.id(),
    ElementId::ExtendedCapabilities.id(),
    ElementId::VendorSpecific.id(),
];

/// Supported rates, extended supported rates
pub const RATE_IDS: [u8; 2] = [
    ElementId::SupportedRates.id(),
    ElementId::ExtendedSupportedRates.id(),
];

/// Vendor elements contribute only OUI (3 bytes) + subtype (1 byte)
const VENDOR_PREFIX_LEN: usize = 4;

/// Bytes an element contributes to a digest
pub fn contribution(element: &TaggedElement) -> &[u8] {
    if element.id == ElementId::VendorSpecific.id() {
        let len = element.payload.len().min(VENDOR_PREFIX_LEN);
        &element.payload[..len]
    } else {
        &element.payload
    }
}

/// Digest the elements whose id is in `ids`, as lowercase hex.
pub fn compute_digest(elements: &[TaggedElement], ids: &[u8]) -> String {
    let mut selected: Vec<&TaggedElement> =
        elements.iter().filter(|e| ids.contains(&e.id)).collect();
    // stable: equal ids keep their arrival order
    selected.sort_by_key(|e| e.id);

    let mut hasher = Sha256::new();
    for element in selected {
        hasher.update([element.id]);
        hasher.update(contribution(element));
    }
    hex::encode(hasher.finalize())
}

pub fn stable_fingerprint(elements: &[TaggedElement]) -> String {
    compute_digest(elements, &STABLE_IDS)
}

pub fn rate_fingerprint(elements: &[TaggedElement]) -> String {
    compute_digest(elements, &RATE_IDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TaggedElement> {
        vec![
            TaggedElement::new(0, b"office".to_vec()),
            TaggedElement::new(1, vec![0x82, 0x84, 0x8b, 0x96]),
            TaggedElement::new(50, vec![0x0c, 0x12, 0x18]),
            TaggedElement::new(45, vec![0xef, 0x01, 0x1b, 0xff]),
            TaggedElement::new(127, vec![0x00, 0x00, 0x08, 0x04]),
            TaggedElement::new(221, vec![0x00, 0x50, 0xf2, 0x08, 0x00, 0x10]),
        ]
    }

    #[test]
    fn test_digest_shape() {
        let digest = stable_fingerprint(&sample());
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_matches_manual_stream() {
        let elements = vec![
            TaggedElement::new(221, vec![1, 2, 3, 4, 5]),
            TaggedElement::new(45, vec![9, 9]),
        ];
        let expected = hex::encode(Sha256::digest([45u8, 9, 9, 221, 1, 2, 3, 4]));
        assert_eq!(stable_fingerprint(&elements), expected);
    }

    #[test]
    fn test_digest_is_order_invariant() {
        let elements = sample();
        let mut reversed = elements.clone();
        reversed.reverse();
        let mut rotated = elements.clone();
        rotated.rotate_left(2);

        let digest = stable_fingerprint(&elements);
        assert_eq!(stable_fingerprint(&reversed), digest);
        assert_eq!(stable_fingerprint(&rotated), digest);
        assert_eq!(rate_fingerprint(&reversed), rate_fingerprint(&elements));
    }

    #[test]
    fn test_digest_sensitive_to_selected_bytes() {
        let base = sample();
        let digest = stable_fingerprint(&base);

        let mut changed = base.clone();
        changed[3].payload[1] ^= 0x01; // id 45
        assert_ne!(stable_fingerprint(&changed), digest);

        let mut vendor = base.clone();
        vendor[5].payload[3] = 0x09; // id 221 subtype byte
        assert_ne!(stable_fingerprint(&vendor), digest);
    }

    #[test]
    fn test_digest_ignores_unselected_elements() {
        let base = sample();
        let digest = stable_fingerprint(&base);

        let mut changed = base.clone();
        changed[0].payload = b"elsewhere".to_vec(); // SSID
        changed[1].payload.push(0x24); // rates
        changed.push(TaggedElement::new(191, vec![0x32; 12]));
        assert_eq!(stable_fingerprint(&changed), digest);

        // bytes past the vendor prefix do not count
        let mut vendor_tail = base.clone();
        vendor_tail[5].payload[5] = 0xaa;
        assert_eq!(stable_fingerprint(&vendor_tail), digest);

        // the rate digest does change
        assert_ne!(rate_fingerprint(&changed), rate_fingerprint(&base));
    }

    #[test]
    fn test_vendor_truncation_safety() {
        for len in [0usize, 1, 3, 4, 10] {
            let payload: Vec<u8> = (0..len as u8).collect();
            let element = TaggedElement::new(221, payload);
            assert_eq!(contribution(&element).len(), len.min(4));
            let _ = stable_fingerprint(&[element]);
        }

        let four = TaggedElement::new(221, vec![0, 1, 2, 3]);
        let ten = TaggedElement::new(221, (0..10).collect::<Vec<u8>>());
        assert_eq!(contribution(&four), contribution(&ten));
        assert_eq!(stable_fingerprint(&[four]), stable_fingerprint(&[ten]));
    }

    #[test]
    fn test_duplicate_ids_keep_arrival_order() {
        let a = TaggedElement::new(221, vec![0x00, 0x50, 0xf2, 0x04]);
        let b = TaggedElement::new(221, vec![0x00, 0x10, 0x18, 0x02]);
        let ht = TaggedElement::new(45, vec![0x6f; 26]);

        let ab = stable_fingerprint(&[a.clone(), b.clone()]);
        let ba = stable_fingerprint(&[b.clone(), a.clone()]);
        assert_ne!(ab, ba);

        // moving other ids around same-id elements leaves the digest alone
        let interleaved = stable_fingerprint(&[a.clone(), ht.clone(), b.clone()]);
        assert_eq!(stable_fingerprint(&[ht.clone(), a.clone(), b.clone()]), interleaved);
        assert_eq!(stable_fingerprint(&[a, b, ht]), interleaved);
    }

    #[test]
    fn test_empty_selection_is_deterministic() {
        let only_ssid = vec![TaggedElement::new(0, b"x".to_vec())];
        assert_eq!(stable_fingerprint(&only_ssid), stable_fingerprint(&[]));
        assert_eq!(stable_fingerprint(&[]), hex::encode(Sha256::digest(b"")));
    }
}
