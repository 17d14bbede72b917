//! MySQL dialect. Schemas and databases are the same object in MySQL, so
//! tenant schemas and the `migrator` schema are plain databases here.

use super::Dialect;

pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn create_schema_sql(&self, schema: &str) -> String {
        format!("create schema if not exists {}", schema)
    }

    fn create_tenants_table_sql(&self) -> String {
        "create table if not exists migrator.migrator_tenants (\
         name varchar(200) primary key, \
         created timestamp not null default current_timestamp)"
            .to_string()
    }

    fn create_migrations_table_sql(&self) -> String {
        // MySQL cannot add indexes idempotently after the fact, so the
        // version_id index is declared inline.
        "create table if not exists migrator.migrator_migrations (\
         id int not null auto_increment primary key, \
         name varchar(200) not null, \
         source_dir varchar(200) not null, \
         filename varchar(200) not null, \
         type int not null, \
         db_schema varchar(200) not null, \
         created timestamp not null default current_timestamp, \
         contents text, \
         checksum varchar(64), \
         version_id int, \
         index migrator_migrations_version_id_idx (version_id))"
            .to_string()
    }

    fn create_versions_table_sql(&self) -> Vec<String> {
        vec![
            "create table if not exists migrator.migrator_versions (\
             id int not null auto_increment primary key, \
             name varchar(200) not null, \
             created timestamp not null default current_timestamp, \
             index migrator_versions_name_idx (name))"
                .to_string(),
        ]
    }

    fn tenant_select_sql(&self) -> String {
        "select name from migrator.migrator_tenants".to_string()
    }

    fn tenant_insert_sql(&self) -> String {
        "insert into migrator.migrator_tenants (name) values (?)".to_string()
    }

    fn version_insert_sql(&self) -> String {
        "insert into migrator.migrator_versions (name) values (?)".to_string()
    }

    fn migration_insert_sql(&self) -> String {
        "insert into migrator.migrator_migrations \
         (name, source_dir, filename, type, db_schema, contents, checksum, version_id) \
         values (?, ?, ?, ?, ?, ?, ?, ?)"
            .to_string()
    }

    fn versions_select_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from migrator.migrator_versions mv \
         left join migrator.migrator_migrations mm on mv.id = mm.version_id \
         order by mv.id desc, mm.id"
            .to_string()
    }

    fn version_by_id_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from migrator.migrator_versions mv \
         left join migrator.migrator_migrations mm on mv.id = mm.version_id \
         where mv.id = ? \
         order by mm.id"
            .to_string()
    }

    fn versions_by_file_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from migrator.migrator_versions mv \
         left join migrator.migrator_migrations mm on mv.id = mm.version_id \
         where mv.id in (select version_id from migrator.migrator_migrations \
         where filename = ?) \
         order by mv.id desc, mm.id"
            .to_string()
    }

    fn migration_by_id_sql(&self) -> String {
        "select id, name, source_dir, filename, type, db_schema, created, \
         contents, checksum, version_id \
         from migrator.migrator_migrations \
         where id = ?"
            .to_string()
    }

    fn migration_select_sql(&self) -> String {
        "select id, name, source_dir, filename, type, db_schema, created, \
         contents, checksum, version_id \
         from migrator.migrator_migrations \
         order by name, source_dir, db_schema"
            .to_string()
    }

    fn last_insert_id_supported(&self) -> bool {
        true
    }
}
