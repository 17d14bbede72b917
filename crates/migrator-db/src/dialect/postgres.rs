//! PostgreSQL dialect.

use super::Dialect;

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn create_schema_sql(&self, schema: &str) -> String {
        format!("create schema if not exists {}", schema)
    }

    fn create_tenants_table_sql(&self) -> String {
        "create table if not exists migrator.migrator_tenants (\
         name varchar(200) primary key, \
         created timestamptz not null default now())"
            .to_string()
    }

    fn create_migrations_table_sql(&self) -> String {
        "create table if not exists migrator.migrator_migrations (\
         id serial primary key, \
         name varchar(200) not null, \
         source_dir varchar(200) not null, \
         filename varchar(200) not null, \
         type int not null, \
         db_schema varchar(200) not null, \
         created timestamptz not null default now(), \
         contents text, \
         checksum varchar(64), \
         version_id integer)"
            .to_string()
    }

    fn create_versions_table_sql(&self) -> Vec<String> {
        vec![
            "create table if not exists migrator.migrator_versions (\
             id serial primary key, \
             name varchar(200) not null, \
             created timestamptz not null default now())"
                .to_string(),
            "create index if not exists migrator_versions_name_idx \
             on migrator.migrator_versions (name)"
                .to_string(),
            "create index if not exists migrator_migrations_version_id_idx \
             on migrator.migrator_migrations (version_id)"
                .to_string(),
            // add constraint has no if-not-exists form
            "do $$ begin \
             if not exists (select 1 from information_schema.table_constraints \
             where constraint_schema = 'migrator' \
             and constraint_name = 'migrator_migrations_version_id_fk') then \
             alter table migrator.migrator_migrations \
             add constraint migrator_migrations_version_id_fk \
             foreign key (version_id) references migrator.migrator_versions (id); \
             end if; \
             end $$"
                .to_string(),
        ]
    }

    fn tenant_select_sql(&self) -> String {
        "select name from migrator.migrator_tenants".to_string()
    }

    fn tenant_insert_sql(&self) -> String {
        "insert into migrator.migrator_tenants (name) values ($1)".to_string()
    }

    fn version_insert_sql(&self) -> String {
        "insert into migrator.migrator_versions (name) values ($1) returning id".to_string()
    }

    fn migration_insert_sql(&self) -> String {
        "insert into migrator.migrator_migrations \
         (name, source_dir, filename, type, db_schema, contents, checksum, version_id) \
         values ($1, $2, $3, $4, $5, $6, $7, $8)"
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
         where mv.id = $1 \
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
         where filename = $1) \
         order by mv.id desc, mm.id"
            .to_string()
    }

    fn migration_by_id_sql(&self) -> String {
        "select id, name, source_dir, filename, type, db_schema, created, \
         contents, checksum, version_id \
         from migrator.migrator_migrations \
         where id = $1"
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
        false
    }
}
