//! Object identifier formatting for diagnostics.

/// Render DER OID content octets in dotted form, e.g. `1.2.840.113549.1.7.2`.
///
/// Malformed encodings render with a `?` marker rather than failing; the result
/// is only used in messages and logs.
#[must_use]
pub fn oid_to_string(content: &[u8]) -> String {
    let Some((&first, rest)) = content.split_first() else {
        return "?".to_string();
    };

    let mut arcs: Vec<String> = Vec::new();
    let mut value: u64 = u64::from(first & 0x7f);
    let mut pending = first & 0x80 != 0;
    let mut first_arc_done = false;

    let emit = |value: u64, first_arc_done: &mut bool, arcs: &mut Vec<String>| {
        if *first_arc_done {
            arcs.push(value.to_string());
        } else {
            let (a, b) = match value {
                0..=39 => (0, value),
                40..=79 => (1, value - 40),
                _ => (2, value - 80),
            };
            arcs.push(a.to_string());
            arcs.push(b.to_string());
            *first_arc_done = true;
        }
    };

    if !pending {
        emit(value, &mut first_arc_done, &mut arcs);
        value = 0;
    }
    for &byte in rest {
        value = (value << 7) | u64::from(byte & 0x7f);
        pending = byte & 0x80 != 0;
        if !pending {
            emit(value, &mut first_arc_done, &mut arcs);
            value = 0;
        }
    }
    if pending {
        arcs.push("?".to_string());
    }
    arcs.join(".")
}
