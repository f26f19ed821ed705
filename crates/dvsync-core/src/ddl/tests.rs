use super::*;
use indoc::indoc;

const SHOP_DDL: &str = indoc! {"
    CREATE TABLE `Customer` (
        `id` INT NOT NULL AUTO_INCREMENT,
        `name` VARCHAR(100) NOT NULL,
        `code` VARCHAR(20),
        `CreatedAt` DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (`id`),
        UNIQUE KEY `UQ_Customer_Code` (`code`)
    ) ENGINE=InnoDB;

    CREATE TABLE `Order` (
        `id` INT NOT NULL,
        `customer_id` INT NOT NULL,
        `total` DECIMAL(12,4),
        PRIMARY KEY (`id`),
        CONSTRAINT `FK_Order_Customer` FOREIGN KEY (`customer_id`) REFERENCES `Customer` (`id`) ON DELETE CASCADE
    );
"};

mod table_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tables_in_order() {
        let schema = parse_schema(SHOP_DDL).unwrap();

        assert_eq!(
            schema.table_names().collect::<Vec<_>>(),
            vec!["Customer", "Order"]
        );
    }

    #[test]
    fn test_parse_columns() {
        let schema = parse_schema(SHOP_DDL).unwrap();
        let customer = schema.table("customer").unwrap();

        assert_eq!(customer.columns.len(), 4);

        let id = customer.column("id").unwrap();
        assert!(!id.nullable);
        assert!(id.is_auto_increment);

        let name = customer.column("name").unwrap();
        assert_eq!(name.data_type.to_lowercase(), "varchar(100)");
        assert!(!name.nullable);

        let code = customer.column("code").unwrap();
        assert!(code.nullable);
        assert!(!code.is_auto_increment);

        let created = customer.column("CreatedAt").unwrap();
        assert!(created.default_value.is_some());
    }

    #[test]
    fn test_ignores_other_statements() {
        let sql = indoc! {"
            SET NAMES utf8mb4;
            CREATE TABLE tag (id INT PRIMARY KEY, label VARCHAR(40));
            INSERT INTO tag (id, label) VALUES (1, 'a');
        "};

        let schema = parse_schema(sql).unwrap();
        assert_eq!(schema.tables.len(), 1);
    }

    #[test]
    fn test_script_without_tables_is_an_error() {
        let result = parse_schema("SELECT 1;");
        assert!(matches!(result, Err(SyncError::Ddl(_))));
    }

    #[test]
    fn test_invalid_sql_is_an_error() {
        let result = parse_schema("CREATE TABLE (");
        assert!(matches!(result, Err(SyncError::Ddl(_))));
    }
}

mod constraint_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_level_primary_key() {
        let schema = parse_schema(SHOP_DDL).unwrap();
        let customer = schema.table("Customer").unwrap();

        let pk = customer.primary_key.as_ref().unwrap();
        assert_eq!(pk.columns, vec!["id".to_string()]);
        assert_eq!(pk.single_column(), Some("id"));
    }

    #[test]
    fn test_inline_primary_key_and_unique() {
        let sql = "CREATE TABLE tag (id INT PRIMARY KEY, label VARCHAR(40) UNIQUE);";
        let schema = parse_schema(sql).unwrap();
        let tag = schema.table("tag").unwrap();

        assert_eq!(tag.primary_key.as_ref().unwrap().columns, vec!["id".to_string()]);
        assert!(!tag.column("id").unwrap().nullable);
        assert_eq!(tag.unique_keys.len(), 1);
        assert_eq!(tag.unique_keys[0].name, "UQ_tag_label");
        assert_eq!(tag.unique_keys[0].columns, vec!["label".to_string()]);
    }

    #[test]
    fn test_named_unique_key() {
        let schema = parse_schema(SHOP_DDL).unwrap();
        let customer = schema.table("Customer").unwrap();

        assert_eq!(customer.unique_keys.len(), 1);
        assert_eq!(customer.unique_keys[0].name, "UQ_Customer_Code");
        assert_eq!(customer.unique_keys[0].columns, vec!["code".to_string()]);
    }

    #[test]
    fn test_composite_primary_key() {
        let sql = indoc! {"
            CREATE TABLE order_line (
                order_id INT,
                line_no INT,
                PRIMARY KEY (order_id, line_no)
            );
        "};
        let schema = parse_schema(sql).unwrap();
        let table = schema.table("order_line").unwrap();

        let pk = table.primary_key.as_ref().unwrap();
        assert_eq!(pk.columns.len(), 2);
        assert_eq!(pk.single_column(), None);
        assert!(table.columns.iter().all(|column| !column.nullable));
    }

    #[test]
    fn test_named_foreign_key() {
        let schema = parse_schema(SHOP_DDL).unwrap();
        let order = schema.table("Order").unwrap();

        assert_eq!(order.foreign_keys.len(), 1);
        let fk = &order.foreign_keys[0];
        assert_eq!(fk.name, "FK_Order_Customer");
        assert_eq!(fk.columns, vec!["customer_id".to_string()]);
        assert_eq!(fk.referenced_table, "Customer");
        assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
        assert_eq!(fk.on_delete.as_deref().map(str::to_uppercase).as_deref(), Some("CASCADE"));
        assert_eq!(fk.single_column(), Some("customer_id"));
    }

    #[test]
    fn test_inline_references() {
        let sql = indoc! {"
            CREATE TABLE invoice (
                id INT PRIMARY KEY,
                customer_id INT REFERENCES customer (id)
            );
        "};
        let schema = parse_schema(sql).unwrap();
        let invoice = schema.table("invoice").unwrap();

        assert_eq!(invoice.foreign_keys.len(), 1);
        assert_eq!(invoice.foreign_keys[0].name, "FK_invoice_customer_id");
        assert_eq!(invoice.foreign_keys[0].referenced_table, "customer");
    }
}
