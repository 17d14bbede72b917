//! MS SQL Server dialect. The family has no `IF NOT EXISTS` for schemas or
//! tables, so every DDL statement carries its own existence guard.

use super::Dialect;

pub struct MsSqlDialect;

impl Dialect for MsSqlDialect {
    fn create_schema_sql(&self, schema: &str) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = N'{0}') \
             BEGIN EXEC sp_executesql N'CREATE SCHEMA {0}' END",
            schema
        )
    }

    fn create_tenants_table_sql(&self) -> String {
        "IF OBJECT_ID(N'[migrator].[migrator_tenants]', N'U') IS NULL \
         BEGIN create table [migrator].[migrator_tenants] (\
         name varchar(200) primary key, \
         created datetimeoffset not null default sysdatetimeoffset()) END"
            .to_string()
    }

    fn create_migrations_table_sql(&self) -> String {
        "IF OBJECT_ID(N'[migrator].[migrator_migrations]', N'U') IS NULL \
         BEGIN create table [migrator].[migrator_migrations] (\
         id int identity (1,1) primary key, \
         name varchar(200) not null, \
         source_dir varchar(200) not null, \
         filename varchar(200) not null, \
         type int not null, \
         db_schema varchar(200) not null, \
         created datetimeoffset not null default sysdatetimeoffset(), \
         contents nvarchar(max), \
         checksum varchar(64), \
         version_id int) END"
            .to_string()
    }

    fn create_versions_table_sql(&self) -> Vec<String> {
        vec![
            "IF OBJECT_ID(N'[migrator].[migrator_versions]', N'U') IS NULL \
             BEGIN create table [migrator].[migrator_versions] (\
             id int identity (1,1) primary key, \
             name varchar(200) not null, \
             created datetimeoffset not null default sysdatetimeoffset()) END"
                .to_string(),
            "IF NOT EXISTS (SELECT * FROM sys.indexes \
             WHERE name = 'migrator_migrations_version_id_idx') \
             BEGIN create index migrator_migrations_version_id_idx \
             on [migrator].[migrator_migrations] (version_id) END"
                .to_string(),
        ]
    }

    fn tenant_select_sql(&self) -> String {
        "select name from [migrator].[migrator_tenants]".to_string()
    }

    fn tenant_insert_sql(&self) -> String {
        "insert into [migrator].[migrator_tenants] (name) values (@p1)".to_string()
    }

    fn version_insert_sql(&self) -> String {
        "insert into [migrator].[migrator_versions] (name) output inserted.id values (@p1)"
            .to_string()
    }

    fn migration_insert_sql(&self) -> String {
        "insert into [migrator].[migrator_migrations] \
         (name, source_dir, filename, type, db_schema, contents, checksum, version_id) \
         values (@p1, @p2, @p3, @p4, @p5, @p6, @p7, @p8)"
            .to_string()
    }

    fn versions_select_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from [migrator].[migrator_versions] mv \
         left join [migrator].[migrator_migrations] mm on mv.id = mm.version_id \
         order by mv.id desc, mm.id"
            .to_string()
    }

    fn version_by_id_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from [migrator].[migrator_versions] mv \
         left join [migrator].[migrator_migrations] mm on mv.id = mm.version_id \
         where mv.id = @p1 \
         order by mm.id"
            .to_string()
    }

    fn versions_by_file_sql(&self) -> String {
        "select mv.id, mv.name, mv.created, \
         mm.id, mm.name, mm.source_dir, mm.filename, mm.type, mm.db_schema, \
         mm.created, mm.contents, mm.checksum \
         from [migrator].[migrator_versions] mv \
         left join [migrator].[migrator_migrations] mm on mv.id = mm.version_id \
         where mv.id in (select version_id from [migrator].[migrator_migrations] \
         where filename = @p1) \
         order by mv.id desc, mm.id"
            .to_string()
    }

    fn migration_by_id_sql(&self) -> String {
        "select id, name, source_dir, filename, type, db_schema, created, \
         contents, checksum, version_id \
         from [migrator].[migrator_migrations] \
         where id = @p1"
            .to_string()
    }

    fn migration_select_sql(&self) -> String {
        "select id, name, source_dir, filename, type, db_schema, created, \
         contents, checksum, version_id \
         from [migrator].[migrator_migrations] \
         order by name, source_dir, db_schema"
            .to_string()
    }

    fn last_insert_id_supported(&self) -> bool {
        false
    }
}
