//! Shared fixtures: archive trees built in temporary directories

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const METADATA_NS: &str = "http://www.bar.admin.ch/xmlns/siard/2/metadata.xsd";
pub const TABLE_NS: &str = "http://www.bar.admin.ch/xmlns/siard/2/table.xsd";

/// Two related tables, two translatable views and one view without a query
pub const SHOP_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<siardArchive xmlns="http://www.bar.admin.ch/xmlns/siard/2/metadata.xsd" version="2.1">
  <dbname>shop</dbname>
  <schemas>
    <schema>
      <name>shop</name>
      <folder>schema1</folder>
      <description>Web shop</description>
      <tables>
        <table>
          <name>customers</name>
          <folder>table1</folder>
          <columns>
            <column><name>id</name><type>INTEGER</type><nullable>false</nullable></column>
            <column><name>name</name><type>VARCHAR(100)</type><nullable>false</nullable></column>
            <column><name>email</name><type>VARCHAR(255)</type></column>
            <column><name>active</name><type>BOOLEAN</type><nullable>false</nullable></column>
          </columns>
          <primaryKey><name>pk_customers</name><column>id</column></primaryKey>
        </table>
        <table>
          <name>orders</name>
          <folder>table2</folder>
          <columns>
            <column><name>id</name><type>INTEGER</type><nullable>false</nullable></column>
            <column><name>customer_id</name><type>INTEGER</type></column>
            <column><name>total</name><type>DECIMAL(10, 2)</type></column>
            <column><name>placed</name><type>DATE</type></column>
          </columns>
          <primaryKey><name>pk_orders</name><column>id</column></primaryKey>
          <foreignKey>
            <name>fk_orders_customer</name>
            <referencedSchema>shop</referencedSchema>
            <referencedTable>customers</referencedTable>
            <reference><column>customer_id</column><referenced>id</referenced></reference>
          </foreignKey>
          <foreignKey>
            <name>fk_orders_ghost</name>
            <referencedSchema>shop</referencedSchema>
            <referencedTable>ghosts</referencedTable>
            <reference><column>customer_id</column><referenced>id</referenced></reference>
          </foreignKey>
        </table>
      </tables>
      <views>
        <view>
          <name>v_active_customers</name>
          <query>CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `v_active_customers` AS SELECT `id`, `name` FROM `customers` WHERE `active` = true;</query>
        </view>
        <view>
          <name>v_big_orders</name>
          <query>SELECT TOP 10 id, total FROM orders ORDER BY total DESC</query>
        </view>
        <view>
          <name>v_unknown</name>
        </view>
      </views>
    </schema>
  </schemas>
</siardArchive>
"#;

/// Build a table data document; `None` cells are written as nil elements
pub fn table_xml(rows: &[&[Option<&str>]]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<table xmlns=\"{}\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n",
        TABLE_NS
    );
    for row in rows {
        xml.push_str("  <row>");
        for (i, cell) in row.iter().enumerate() {
            match cell {
                Some(value) => xml.push_str(&format!("<c{n}>{}</c{n}>", value, n = i + 1)),
                None => xml.push_str(&format!("<c{} xsi:nil=\"true\"/>", i + 1)),
            }
        }
        xml.push_str("</row>\n");
    }
    xml.push_str("</table>\n");
    xml
}

pub fn customers_xml() -> String {
    table_xml(&[
        &[Some("1"), Some("Alice"), Some("alice@example.com"), Some("true")],
        &[Some("2"), Some("Bob"), Some("bob@example.com"), Some("0")],
        &[Some("3"), Some("Carol"), None, Some("false")],
    ])
}

pub fn orders_xml() -> String {
    table_xml(&[
        &[Some("10"), Some("1"), Some("19.99"), Some("2024-01-02")],
        &[Some("11"), Some("1"), Some("n/a"), Some("2024-01-03")],
        &[Some("12"), Some("3"), Some("5.5"), Some("2024-02-01")],
    ])
}

/// An extracted archive tree in a temporary directory
pub struct ArchiveFixture {
    dir: TempDir,
}

impl ArchiveFixture {
    /// Tree with only `header/metadata.xml`
    pub fn new(metadata: &str) -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fixture.add_file("header/metadata.xml", metadata);
        fixture
    }

    /// The shop archive with data for both tables
    pub fn shop() -> Self {
        let fixture = Self::new(SHOP_METADATA);
        fixture.add_file("content/schema1/table1/table1.xml", &customers_xml());
        fixture.add_file("content/schema1/table2/table2.xml", &orders_xml());
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Zip the tree into `dest`
    pub fn zip_to(&self, dest: &Path) {
        let file = File::create(dest).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        add_dir(&mut writer, self.root(), self.root());
        writer.finish().unwrap();
    }
}

fn add_dir(writer: &mut zip::ZipWriter<File>, base: &Path, dir: &Path) {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            add_dir(writer, base, &path);
        } else {
            let name = path
                .strip_prefix(base)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&fs::read(&path).unwrap()).unwrap();
        }
    }
}
