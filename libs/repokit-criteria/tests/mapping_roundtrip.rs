#![allow(clippy::unwrap_used, clippy::expect_used)]

use repokit_criteria::{
    Filter, Identity, Mapping, Operator, PropertyMap, Row, Scalar, SerdeFlattener, Sort,
    flatten::Flattener, validate,
};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    id: i64,
    name: String,
    total_orders: i64,
    total_earnings: f64,
    date: String,
}

impl Identity for Customer {
    fn id(&self) -> Scalar {
        Scalar::Int(self.id)
    }
}

struct CustomerMapping {
    map: PropertyMap,
}

impl CustomerMapping {
    fn new() -> Self {
        Self {
            map: PropertyMap::new()
                .with("id", "customer_id")
                .with("name", "customer_name")
                .with("totalOrders", "total_orders")
                .with("totalEarnings", "total_earnings")
                .with("date", "created_at"),
        }
    }
}

impl Mapping for CustomerMapping {
    type Entity = Customer;

    fn name(&self) -> &str {
        "customers"
    }

    fn identity(&self) -> &str {
        "customer_id"
    }

    fn map(&self) -> &PropertyMap {
        &self.map
    }

    fn to_row(&self, c: &Customer) -> Row {
        Row::new()
            .with("customer_id", c.id)
            .with("customer_name", c.name.as_str())
            .with("total_orders", c.total_orders)
            .with("total_earnings", c.total_earnings)
            .with("created_at", c.date.as_str())
    }

    fn from_row(&self, row: &Row) -> Option<Customer> {
        if row.is_empty() {
            return None;
        }
        Some(Customer {
            id: row.get_i64("customer_id")?,
            name: row.get_str("customer_name").unwrap_or_default().to_owned(),
            total_orders: row.get_i64("total_orders").unwrap_or_default(),
            total_earnings: row.get_f64("total_earnings").unwrap_or_default(),
            date: row.get_str("created_at").unwrap_or_default().to_owned(),
        })
    }
}

fn customers() -> Vec<Customer> {
    vec![
        Customer {
            id: 1,
            name: "John Doe".to_owned(),
            total_orders: 3,
            total_earnings: 5.55,
            date: "2014-12-11".to_owned(),
        },
        Customer {
            id: 4,
            name: "Ken Sugimori".to_owned(),
            total_orders: 4,
            total_earnings: 69_158.69,
            date: "2010-12-10".to_owned(),
        },
    ]
}

#[test]
fn from_row_inverts_to_row() {
    let mapping = CustomerMapping::new();
    validate(&mapping).unwrap();

    for customer in customers() {
        let row = mapping.to_row(&customer);
        assert_eq!(mapping.from_row(&row), Some(customer));
    }
}

#[test]
fn empty_row_hydrates_to_nothing() {
    assert_eq!(CustomerMapping::new().from_row(&Row::new()), None);
}

#[test]
fn serde_flattener_agrees_with_hand_written_rows() {
    let mapping = CustomerMapping::new();
    for customer in customers() {
        let flattened = SerdeFlattener.flatten(&mapping, &customer).unwrap();
        assert_eq!(flattened, mapping.to_row(&customer));
    }
}

#[test]
fn criteria_reference_mapped_properties() {
    let mapping = CustomerMapping::new();
    let mut filter = Filter::new();
    filter.must().contain("name", "Ken");
    filter.must_not().range("totalOrders", 2, 4);
    let sort = Sort::new().desc("name");

    for property in filter
        .properties()
        .chain(sort.orders().iter().map(|k| k.property.as_str()))
    {
        assert!(mapping.map().column(property).is_ok(), "{property}");
    }
    assert_eq!(
        filter.must().get(Operator::Contains)[0].property,
        "name".to_owned()
    );
}
