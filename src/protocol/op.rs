//! Operation codes, request decoding, and response payload encodings
//! (spec.md §4.1). Dispatch on the wire `type` field is a single exhaustive
//! `match` over [`Request`] rather than an integer-keyed table of handlers
//! (spec.md §9, "Dynamic dispatch on operation code").

use super::codec::{read_double, read_int, read_utf, write_double, write_int, write_utf};
use crate::constants::MAX_FILTER_PRODUCTS;
use crate::error::Error;
use crate::sale::Sale;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Register = 1,
    Login = 2,
    AddEvent = 3,
    NewDay = 4,
    AggrQty = 5,
    AggrVol = 6,
    AggrAvg = 7,
    AggrMax = 8,
    Filter = 9,
    WaitSimul = 10,
    WaitConsec = 11,
    GetCurrentDay = 12,
}

impl OpCode {
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            1 => OpCode::Register,
            2 => OpCode::Login,
            3 => OpCode::AddEvent,
            4 => OpCode::NewDay,
            5 => OpCode::AggrQty,
            6 => OpCode::AggrVol,
            7 => OpCode::AggrAvg,
            8 => OpCode::AggrMax,
            9 => OpCode::Filter,
            10 => OpCode::WaitSimul,
            11 => OpCode::WaitConsec,
            12 => OpCode::GetCurrentDay,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggrKind {
    Qty,
    Vol,
    Avg,
    Max,
}

/// A decoded request, independent of authentication state — the
/// connection handler enforces the `UNAUTH`/`AUTH` gate before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Register { user: String, pass: String },
    Login { user: String, pass: String },
    AddEvent { product: String, qty: i32, price: f64 },
    NewDay,
    Aggregate { kind: AggrKind, product: String, days: i32 },
    Filter { day: i32, products: Vec<String> },
    WaitSimul { p1: String, p2: String },
    WaitConsec { n: i32 },
    GetCurrentDay,
}

/// Decodes a request from the wire `type` code and payload bytes.
///
/// Returns [`Error::Protocol`] for an unrecognized op code or a payload
/// that doesn't match the op's expected shape — both are reported to the
/// client as a 500 with the error message (spec.md §9: "Tags that fail to
/// decode are reported as 500 with a message").
pub fn decode_request(op_code: i32, payload: &[u8]) -> Result<Request, Error> {
    let op = OpCode::from_i32(op_code)
        .ok_or_else(|| Error::Protocol(format!("unknown operation code: {op_code}")))?;
    let mut cursor = Cursor::new(payload);

    Ok(match op {
        OpCode::Register => Request::Register {
            user: read_utf(&mut cursor)?,
            pass: read_utf(&mut cursor)?,
        },
        OpCode::Login => Request::Login {
            user: read_utf(&mut cursor)?,
            pass: read_utf(&mut cursor)?,
        },
        OpCode::AddEvent => Request::AddEvent {
            product: read_utf(&mut cursor)?,
            qty: read_int(&mut cursor)?,
            price: read_double(&mut cursor)?,
        },
        OpCode::NewDay => Request::NewDay,
        OpCode::AggrQty | OpCode::AggrVol | OpCode::AggrAvg | OpCode::AggrMax => {
            let product = read_utf(&mut cursor)?;
            let days = read_int(&mut cursor)?;
            let kind = match op {
                OpCode::AggrQty => AggrKind::Qty,
                OpCode::AggrVol => AggrKind::Vol,
                OpCode::AggrAvg => AggrKind::Avg,
                OpCode::AggrMax => AggrKind::Max,
                _ => unreachable!(),
            };
            Request::Aggregate { kind, product, days }
        }
        OpCode::Filter => {
            let day = read_int(&mut cursor)?;
            let n = read_int(&mut cursor)?;
            if n < 0 || n as usize > MAX_FILTER_PRODUCTS {
                return Err(Error::Protocol(format!(
                    "filter count {n} out of range [0, {MAX_FILTER_PRODUCTS}]"
                )));
            }
            // `n` is bounded above, so this reservation is capped regardless
            // of what a hostile client put in the length field.
            let mut products = Vec::with_capacity(n as usize);
            for _ in 0..n {
                products.push(read_utf(&mut cursor)?);
            }
            Request::Filter { day, products }
        }
        OpCode::WaitSimul => Request::WaitSimul {
            p1: read_utf(&mut cursor)?,
            p2: read_utf(&mut cursor)?,
        },
        OpCode::WaitConsec => Request::WaitConsec {
            n: read_int(&mut cursor)?,
        },
        OpCode::GetCurrentDay => Request::GetCurrentDay,
    })
}

pub fn encode_bool(v: bool) -> Vec<u8> {
    vec![u8::from(v)]
}

pub fn decode_bool(payload: &[u8]) -> Result<bool, Error> {
    match payload.first() {
        Some(b) => Ok(*b != 0),
        None => Err(Error::Protocol("expected 1-byte boolean response".into())),
    }
}

pub fn encode_double(v: f64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    write_double(&mut buf, v).expect("writing to a Vec cannot fail");
    buf
}

pub fn decode_double(payload: &[u8]) -> Result<f64, Error> {
    let mut cursor = Cursor::new(payload);
    read_double(&mut cursor)
}

pub fn encode_int(v: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    write_int(&mut buf, v).expect("writing to a Vec cannot fail");
    buf
}

pub fn decode_int(payload: &[u8]) -> Result<i32, Error> {
    let mut cursor = Cursor::new(payload);
    read_int(&mut cursor)
}

/// Winning-product response for WAIT_CONSEC: empty payload means the day
/// ended before the streak was reached.
pub fn encode_optional_utf(value: Option<&str>) -> Vec<u8> {
    match value {
        None => Vec::new(),
        Some(s) => {
            let mut buf = Vec::new();
            write_utf(&mut buf, s).expect("writing to a Vec cannot fail");
            buf
        }
    }
}

pub fn decode_optional_utf(payload: &[u8]) -> Result<Option<String>, Error> {
    if payload.is_empty() {
        return Ok(None);
    }
    let mut cursor = Cursor::new(payload);
    Ok(Some(read_utf(&mut cursor)?))
}

/// Dictionary-encoded FILTER response (spec.md §4.5): each distinct
/// product name is written once, in first-seen order, then every event
/// refers to it by index.
pub fn encode_filter_response(sales: &[Sale]) -> Vec<u8> {
    let mut dict: Vec<&str> = Vec::new();
    let mut index_of = std::collections::HashMap::new();
    for sale in sales {
        index_of.entry(sale.product.as_str()).or_insert_with(|| {
            dict.push(sale.product.as_str());
            (dict.len() - 1) as i32
        });
    }

    let mut buf = Vec::new();
    write_int(&mut buf, dict.len() as i32).unwrap();
    for product in &dict {
        write_utf(&mut buf, product).unwrap();
    }
    write_int(&mut buf, sales.len() as i32).unwrap();
    for sale in sales {
        let idx = *index_of.get(sale.product.as_str()).unwrap();
        write_int(&mut buf, idx).unwrap();
        write_int(&mut buf, sale.quantity).unwrap();
        write_double(&mut buf, sale.price).unwrap();
    }
    buf
}

pub fn decode_filter_response(payload: &[u8]) -> Result<Vec<Sale>, Error> {
    let mut cursor = Cursor::new(payload);
    let dict_size = read_int(&mut cursor)?;
    if dict_size < 0 {
        return Err(Error::Protocol("negative dictionary size".into()));
    }
    // `dict_size`/`num_events` come straight off the wire with no natural
    // upper bound on the response side, so unlike the request-side FILTER
    // count above, these don't get a capped pre-reservation at all.
    let mut dict = Vec::new();
    for _ in 0..dict_size {
        dict.push(read_utf(&mut cursor)?);
    }

    let num_events = read_int(&mut cursor)?;
    if num_events < 0 {
        return Err(Error::Protocol("negative event count".into()));
    }
    let mut sales = Vec::new();
    for _ in 0..num_events {
        let idx = read_int(&mut cursor)?;
        let product = dict
            .get(idx as usize)
            .ok_or_else(|| Error::Protocol(format!("dictionary index out of range: {idx}")))?
            .clone();
        let qty = read_int(&mut cursor)?;
        let price = read_double(&mut cursor)?;
        sales.push(Sale::new(product, qty, price));
    }
    Ok(sales)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_add_event() {
        let mut payload = Vec::new();
        write_utf(&mut payload, "Banana").unwrap();
        write_int(&mut payload, 3).unwrap();
        write_double(&mut payload, 1.5).unwrap();

        let req = decode_request(OpCode::AddEvent.as_i32(), &payload).unwrap();
        assert_eq!(
            req,
            Request::AddEvent {
                product: "Banana".into(),
                qty: 3,
                price: 1.5
            }
        );
    }

    #[test]
    fn decodes_aggregate_variants() {
        let mut payload = Vec::new();
        write_utf(&mut payload, "A").unwrap();
        write_int(&mut payload, 7).unwrap();

        for (code, kind) in [
            (OpCode::AggrQty, AggrKind::Qty),
            (OpCode::AggrVol, AggrKind::Vol),
            (OpCode::AggrAvg, AggrKind::Avg),
            (OpCode::AggrMax, AggrKind::Max),
        ] {
            let req = decode_request(code.as_i32(), &payload).unwrap();
            assert_eq!(
                req,
                Request::Aggregate {
                    kind,
                    product: "A".into(),
                    days: 7
                }
            );
        }
    }

    #[test]
    fn decodes_filter_with_products() {
        let mut payload = Vec::new();
        write_int(&mut payload, 5).unwrap();
        write_int(&mut payload, 2).unwrap();
        write_utf(&mut payload, "Apple").unwrap();
        write_utf(&mut payload, "Banana").unwrap();

        let req = decode_request(OpCode::Filter.as_i32(), &payload).unwrap();
        assert_eq!(
            req,
            Request::Filter {
                day: 5,
                products: vec!["Apple".into(), "Banana".into()]
            }
        );
    }

    #[test]
    fn unknown_op_code_is_an_error() {
        assert!(decode_request(999, &[]).is_err());
    }

    #[test]
    fn filter_count_above_the_cap_is_rejected_before_any_allocation() {
        let mut payload = Vec::new();
        write_int(&mut payload, 0).unwrap();
        write_int(&mut payload, 2_000_000_000).unwrap();

        let err = decode_request(OpCode::Filter.as_i32(), &payload).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn negative_filter_count_is_rejected() {
        let mut payload = Vec::new();
        write_int(&mut payload, 0).unwrap();
        write_int(&mut payload, -1).unwrap();

        assert!(decode_request(OpCode::Filter.as_i32(), &payload).is_err());
    }

    #[test]
    fn filter_response_round_trips() {
        let sales = vec![
            Sale::new("A", 1, 1.0),
            Sale::new("B", 2, 2.0),
            Sale::new("A", 3, 3.0),
        ];
        let encoded = encode_filter_response(&sales);
        let decoded = decode_filter_response(&encoded).unwrap();
        assert_eq!(decoded, sales);
    }

    #[test]
    fn filter_response_dictionary_is_first_seen_order() {
        let sales = vec![Sale::new("B", 1, 1.0), Sale::new("A", 1, 1.0)];
        let encoded = encode_filter_response(&sales);
        let mut cursor = Cursor::new(&encoded[..]);
        let dict_size = read_int(&mut cursor).unwrap();
        assert_eq!(dict_size, 2);
        assert_eq!(read_utf(&mut cursor).unwrap(), "B");
        assert_eq!(read_utf(&mut cursor).unwrap(), "A");
    }

    #[test]
    fn empty_filter_response_round_trips() {
        let encoded = encode_filter_response(&[]);
        let decoded = decode_filter_response(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn optional_utf_none_is_empty_payload() {
        let encoded = encode_optional_utf(None);
        assert!(encoded.is_empty());
        assert_eq!(decode_optional_utf(&encoded).unwrap(), None);
    }

    #[test]
    fn optional_utf_some_round_trips() {
        let encoded = encode_optional_utf(Some("Orange"));
        assert_eq!(decode_optional_utf(&encoded).unwrap(), Some("Orange".to_string()));
    }
}
