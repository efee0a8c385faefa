use crate::types::{ItemAttributes, Order, OrderItem};

/// In-memory cart. Mutated only by explicit quantity/attribute edits;
/// nothing persists beyond the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    store: String,
    items: Vec<OrderItem>,
}

impl Cart {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            items: Vec::new(),
        }
    }

    /// Adopt a recommended order wholesale (the model proposes, the
    /// user edits from there).
    pub fn from_order(order: Order) -> Self {
        Self {
            store: order.store,
            items: order.items,
        }
    }

    pub fn store(&self) -> &str {
        &self.store
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line; an existing line with the same name and attributes
    /// just gains quantity.
    pub fn add(&mut self, item: OrderItem) {
        if item.qty == 0 {
            return;
        }
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.name == item.name && i.attrs == item.attrs)
        {
            existing.qty += item.qty;
        } else {
            self.items.push(item);
        }
    }

    /// Set a line's quantity; zero removes the line. Returns false when
    /// no line matches.
    pub fn set_qty(&mut self, name: &str, qty: u32) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.name == name) else {
            return false;
        };
        if qty == 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].qty = qty;
        }
        true
    }

    /// Replace a line's attributes (spice level, garnishes).
    pub fn set_attributes(&mut self, name: &str, attrs: ItemAttributes) -> bool {
        match self.items.iter_mut().find(|i| i.name == name) {
            Some(item) => {
                item.attrs = Some(attrs);
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.unit_price * i.qty as f64)
            .sum()
    }

    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.qty).sum()
    }

    pub fn into_order(self) -> Order {
        Order {
            store: self.store,
            items: self.items,
        }
    }
}

pub fn format_currency(amount: f64) -> String {
    format!("¥{:.1}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpicyLevel;

    fn item(name: &str, unit_price: f64, qty: u32) -> OrderItem {
        OrderItem {
            name: name.to_string(),
            unit_price,
            qty,
            img: None,
            attrs: None,
        }
    }

    #[test]
    fn add_merges_lines_with_same_name_and_attrs() {
        let mut cart = Cart::new("面馆");
        cart.add(item("牛肉面", 28.0, 1));
        cart.add(item("牛肉面", 28.0, 2));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 3);
    }

    #[test]
    fn different_attrs_stay_separate_lines() {
        let mut cart = Cart::new("面馆");
        cart.add(item("牛肉面", 28.0, 1));
        let mut spicy = item("牛肉面", 28.0, 1);
        spicy.attrs = Some(ItemAttributes {
            spicy: Some(SpicyLevel::Hot),
            ..Default::default()
        });
        cart.add(spicy);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn zero_qty_removes_the_line() {
        let mut cart = Cart::new("面馆");
        cart.add(item("牛肉面", 28.0, 2));
        assert!(cart.set_qty("牛肉面", 0));
        assert!(cart.is_empty());
        assert!(!cart.set_qty("牛肉面", 1));
    }

    #[test]
    fn totals_and_count() {
        let mut cart = Cart::new("面馆");
        cart.add(item("牛肉面", 28.0, 2));
        cart.add(item("小菜", 6.5, 1));
        assert_eq!(cart.total(), 62.5);
        assert_eq!(cart.count(), 3);
        assert_eq!(format_currency(cart.total()), "¥62.5");
        assert_eq!(format_currency(28.0), "¥28.0");
    }

    #[test]
    fn attribute_edit_replaces_attrs() {
        let mut cart = Cart::new("面馆");
        cart.add(item("牛肉面", 28.0, 1));
        assert!(cart.set_attributes(
            "牛肉面",
            ItemAttributes {
                spicy: Some(SpicyLevel::Medium),
                scallion: Some(false),
                coriander: Some(true),
            }
        ));
        let attrs = cart.items()[0].attrs.unwrap();
        assert_eq!(attrs.spicy, Some(SpicyLevel::Medium));
        assert_eq!(attrs.coriander, Some(true));
    }
}
