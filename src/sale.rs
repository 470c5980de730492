//! The immutable sale record.

/// A single recorded sale. Once constructed, fields never mutate.
///
/// Quantity and price are accepted as given — zero and negative quantities,
/// zero prices, and so on are all legal; the engine never rejects a sale on
/// the basis of its values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub product: String,
    pub quantity: i32,
    pub price: f64,
}

impl Sale {
    pub fn new(product: impl Into<String>, quantity: i32, price: f64) -> Self {
        Self {
            product: product.into(),
            quantity,
            price,
        }
    }
}
