//! Bundled sample restriction schema
//!
//! Used when no schema is configured, so the CLI can be tried out directly.

use managed_config_restrictions::{Resources, Schema, SchemaError, SchemaParser};

/// res/xml/app_restrictions.xml
pub const RESTRICTIONS_XML: &str = include_str!("../res/xml/app_restrictions.xml");

/// res/values/restrictions.xml
pub const VALUES_XML: &str = include_str!("../res/values/restrictions.xml");

/// Parse the bundled schema
pub fn schema() -> Result<Schema, SchemaError> {
    let resources = Resources::parse_string(VALUES_XML)?;
    SchemaParser::parse_string(RESTRICTIONS_XML, &resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use managed_config_restrictions::{keys, RestrictionKind, RestrictionValue};

    #[test]
    fn test_sample_schema() {
        let schema = schema().unwrap();
        let keys: Vec<_> = schema.keys().collect();
        assert_eq!(
            keys,
            vec![
                keys::CAN_SAY_HELLO,
                keys::MESSAGE,
                keys::NUMBER,
                keys::RANK,
                keys::APPROVALS,
                "secret_code",
                keys::ITEMS,
            ]
        );

        assert_eq!(schema.get(keys::CAN_SAY_HELLO).unwrap().default, RestrictionValue::Bool(true));
        assert_eq!(schema.get(keys::NUMBER).unwrap().default, RestrictionValue::Int(10));
        assert_eq!(
            schema.get(keys::RANK).unwrap().default,
            RestrictionValue::Text("apprentice".into())
        );
        assert_eq!(schema.get(keys::APPROVALS).unwrap().default, RestrictionValue::None);
        assert_eq!(
            schema.get(keys::ITEMS).unwrap().kind,
            RestrictionKind::StructuredList
        );
    }
}
