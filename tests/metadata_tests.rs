//! Metadata parsing across namespace and naming variants

mod common;

use common::{ArchiveFixture, METADATA_NS, SHOP_METADATA};
use siard_sqlite::import::{ImportError, METADATA_PATH, MetadataParser};
use siard_sqlite::models::StorageType;

#[test]
fn test_parse_shop_metadata_file() {
    let fixture = ArchiveFixture::new(SHOP_METADATA);
    let mut parser = MetadataParser::new();
    let schemas = parser
        .parse_file(&fixture.root().join(METADATA_PATH))
        .unwrap();

    assert!(parser.warnings().is_empty());
    let shop = &schemas[0];
    assert_eq!(shop.name, "shop");
    assert_eq!(shop.content_folder, "schema1");
    assert_eq!(shop.description.as_deref(), Some("Web shop"));

    let orders = shop.table("orders").unwrap();
    assert_eq!(orders.ordinal_position, 2);
    assert_eq!(
        orders.column("total").unwrap().storage_type,
        StorageType::Real
    );
    assert_eq!(orders.foreign_keys.len(), 2);
    assert_eq!(shop.views.len(), 3);
    assert!(shop.views[2].query.is_none());
}

#[test]
fn test_unqualified_metadata_with_short_names() {
    let xml = r#"<siardArchive>
  <schemas>
    <schema>
      <n>legacy</n>
      <tables>
        <table>
          <n>2019 sales</n>
          <columns>
            <column><n>amount-eur</n><type>NUMERIC(12,2)</type></column>
            <column><n>paid</n><type>BOOL</type></column>
          </columns>
        </table>
      </tables>
    </schema>
  </schemas>
</siardArchive>"#;

    let mut parser = MetadataParser::new();
    let schemas = parser.parse_str(xml).unwrap();
    let table = &schemas[0].tables[0];

    assert_eq!(schemas[0].content_folder, "legacy");
    assert_eq!(table.name, "col_2019_sales");
    assert_eq!(table.column_names(), vec!["amount_eur", "paid"]);
    assert!(table.columns[1].is_boolean());
}

#[test]
fn test_prefixed_namespace_and_query_original() {
    let xml = r#"<md:siardArchive xmlns:md="http://www.bar.admin.ch/xmlns/siard/1.0/metadata.xsd">
  <md:schemas>
    <md:schema>
      <md:name>hr</md:name>
      <md:tables>
        <md:table>
          <md:name>staff</md:name>
          <md:columns>
            <md:column><md:name>id</md:name><md:type>INT</md:type></md:column>
          </md:columns>
        </md:table>
      </md:tables>
      <md:views>
        <md:view><md:name>v_staff</md:name><md:queryOriginal>SELECT id FROM staff</md:queryOriginal></md:view>
      </md:views>
    </md:schema>
  </md:schemas>
</md:siardArchive>"#;

    let mut parser = MetadataParser::new();
    let schemas = parser.parse_str(xml).unwrap();
    let hr = &schemas[0];

    assert_eq!(hr.tables[0].name, "staff");
    assert_eq!(hr.tables[0].columns[0].storage_type, StorageType::Integer);
    assert_eq!(hr.views[0].query.as_deref(), Some("SELECT id FROM staff"));
}

#[test]
fn test_schema_without_name_is_dropped() {
    let xml = r#"<siardArchive><schemas>
  <schema><tables/></schema>
  <schema><name>kept</name></schema>
</schemas></siardArchive>"#;

    let mut parser = MetadataParser::new();
    let schemas = parser.parse_str(xml).unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "kept");
    assert_eq!(parser.warnings().len(), 1);
}

#[test]
fn test_missing_and_malformed_metadata() {
    let fixture = ArchiveFixture::new("<siardArchive><schemas>");
    let mut parser = MetadataParser::new();

    assert!(matches!(
        parser.parse_file(&fixture.root().join(METADATA_PATH)),
        Err(ImportError::MetadataMalformed { .. })
    ));
    assert!(matches!(
        parser.parse_file(&fixture.root().join("header/other.xml")),
        Err(ImportError::MetadataMissing(_))
    ));
}

/// Relational metadata whose element tags get a prefix inserted by `render`
const RELATIONAL_TEMPLATE: &str = r#"<siardArchive{ns}>
  <schemas>
    <schema>
      <name>sales</name>
      <folder>schema1</folder>
      <tables>
        <table>
          <name>customers</name>
          <folder>table1</folder>
          <columns>
            <column><name>id</name><type>INTEGER</type><nullable>false</nullable></column>
            <column><name>email</name><type>VARCHAR(255)</type><nullable>true</nullable></column>
          </columns>
          <primaryKey><name>pk_customers</name><column>id</column></primaryKey>
        </table>
        <table>
          <name>orders</name>
          <folder>table2</folder>
          <columns>
            <column><name>id</name><type>INTEGER</type><nullable>false</nullable></column>
            <column><name>customer_id</name><type>INTEGER</type></column>
            <column><name>total</name><type>DECIMAL(10,2)</type></column>
          </columns>
          <primaryKey><name>pk_orders</name><column>id</column></primaryKey>
          <foreignKey>
            <name>fk_orders_customer</name>
            <referencedSchema>sales</referencedSchema>
            <referencedTable>customers</referencedTable>
            <reference><column>customer_id</column><referenced>id</referenced></reference>
          </foreignKey>
        </table>
      </tables>
      <views>
        <view>
          <name>v_big_orders</name>
          <query>SELECT id, total FROM orders WHERE total > 100</query>
        </view>
      </views>
    </schema>
  </schemas>
</siardArchive>"#;

fn render(prefix: &str, namespace: &str) -> String {
    RELATIONAL_TEMPLATE
        .replace("</", "\u{1}")
        .replace('<', &format!("<{}", prefix))
        .replace('\u{1}', &format!("</{}", prefix))
        .replacen("{ns}", namespace, 1)
}

#[test]
fn test_namespace_styles_yield_identical_trees() {
    let plain = MetadataParser::new().parse_str(&render("", "")).unwrap();
    let default_ns = MetadataParser::new()
        .parse_str(&render("", &format!(r#" xmlns="{}""#, METADATA_NS)))
        .unwrap();
    let prefixed = MetadataParser::new()
        .parse_str(&render("md:", &format!(r#" xmlns:md="{}""#, METADATA_NS)))
        .unwrap();

    let orders = plain[0].table("orders").unwrap();
    assert_eq!(orders.primary_key, Some(vec!["id".to_string()]));
    assert_eq!(orders.foreign_keys.len(), 1);
    assert_eq!(orders.foreign_keys[0].referenced_table, "customers");
    assert!(!orders.column("id").unwrap().nullable);
    assert!(plain[0].table("customers").unwrap().column("email").unwrap().nullable);
    assert_eq!(
        plain[0].views[0].query.as_deref(),
        Some("SELECT id, total FROM orders WHERE total > 100")
    );

    assert_eq!(plain, default_ns);
    assert_eq!(plain, prefixed);
}
