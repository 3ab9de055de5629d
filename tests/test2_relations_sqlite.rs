#![cfg(feature = "sqlite")]

use sql_mapper::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Rol {
    rol_id: i64,
    nombre: String,
    user_id: Option<i64>,
}

impl Entity for Rol {
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
        builder
            .field("RolId", |r| &r.rol_id, |r| &mut r.rol_id)
            .field("Nombre", |r| &r.nombre, |r| &mut r.nombre)
            .field("UserId", |r| &r.user_id, |r| &mut r.user_id)
            .primary_key("RolId")
            .foreign_key::<Usuario>("UserId")
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Usuario {
    id: i64,
    name: String,
    roles: Vec<Rol>,
}

impl Entity for Usuario {
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
        builder
            .field("Id", |u| &u.id, |u| &mut u.id)
            .field("Name", |u| &u.name, |u| &mut u.name)
            .primary_key("Id")
            .one_to_many::<Rol>("Roles", |u| &mut u.roles)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Member {
    id: i64,
    roles: Vec<Role>,
}

impl Entity for Member {
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
        builder
            .field("Id", |m| &m.id, |m| &mut m.id)
            .primary_key("Id")
            .many_to_many::<Role, MemberRole>("Roles", |m| &mut m.roles)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Role {
    id: i64,
    name: String,
}

impl Entity for Role {
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
        builder
            .field("Id", |r| &r.id, |r| &mut r.id)
            .field("Name", |r| &r.name, |r| &mut r.name)
            .primary_key("Id")
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct MemberRole {
    user_id: i64,
    role_id: i64,
}

impl Entity for MemberRole {
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
        builder
            .field("UserId", |j| &j.user_id, |j| &mut j.user_id)
            .field("RoleId", |j| &j.role_id, |j| &mut j.role_id)
            .foreign_key::<Member>("UserId")
            .foreign_key::<Role>("RoleId")
    }
}

fn rol(rol_id: i64, nombre: &str, user_id: Option<i64>) -> Rol {
    Rol {
        rol_id,
        nombre: nombre.to_string(),
        user_id,
    }
}

async fn client() -> Result<SqlClient, SqlMapperError> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    SqlClient::new_sqlite("file::memory:".to_string()).await
}

#[tokio::test]
async fn one_parent_collects_every_child() -> Result<(), Box<dyn std::error::Error>> {
    let client = client().await?;
    let result = client
        .query(
            "SELECT 1 AS Id, 'erick' AS Name;
             SELECT 1 AS RolId, 'dev' AS Nombre
             UNION ALL SELECT 2, 'admin'
             ORDER BY RolId;",
        )
        .execute()
        .await?;

    let user: Usuario = result.map_one_to_many::<Usuario, Rol>("Roles")?;
    assert_eq!(user.id, 1);
    assert_eq!(user.name, "erick");
    assert_eq!(user.roles, vec![rol(1, "dev", None), rol(2, "admin", None)]);
    Ok(())
}

#[tokio::test]
async fn empty_parent_table_is_an_assembly_error() -> Result<(), Box<dyn std::error::Error>> {
    let client = client().await?;
    let result = client
        .query(
            "CREATE TABLE usuario (Id INTEGER, Name TEXT);
             SELECT Id, Name FROM usuario;
             SELECT 1 AS RolId, 'dev' AS Nombre;",
        )
        .execute()
        .await?;
    assert_eq!(result.len(), 2);

    let err = result.map_one_to_many::<Usuario, Rol>("Roles").unwrap_err();
    assert!(matches!(
        err.assembly_failure(),
        Some(AssemblyFailure::MissingParent { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn grouped_children_follow_declared_keys() -> Result<(), Box<dyn std::error::Error>> {
    let client = client().await?;
    let result = client
        .query(
            "SELECT 1 AS Id, 'erick' AS Name UNION ALL SELECT 2, 'ana' ORDER BY Id;
             SELECT 10 AS RolId, 'dev' AS Nombre, 1 AS UserId
             UNION ALL SELECT 11, 'ops', 2
             UNION ALL SELECT 12, 'admin', 1
             UNION ALL SELECT 13, 'ghost', 99
             ORDER BY RolId;",
        )
        .execute()
        .await?;

    let users: Vec<Usuario> = result.map_related::<Usuario, Rol>()?;
    assert_eq!(users.len(), 2);
    assert_eq!(
        users[0].roles,
        vec![rol(10, "dev", Some(1)), rol(12, "admin", Some(1))]
    );
    assert_eq!(users[1].roles, vec![rol(11, "ops", Some(2))]);

    // The orphan referencing user 99 lands in no list.
    let total: usize = users.iter().map(|u| u.roles.len()).sum();
    assert_eq!(total, 3);
    Ok(())
}

#[tokio::test]
async fn many_to_many_keeps_join_order() -> Result<(), Box<dyn std::error::Error>> {
    let client = client().await?;
    let result = client
        .query(
            "SELECT 1 AS Id UNION ALL SELECT 2 ORDER BY Id;
             SELECT 10 AS Id, 'dev' AS Name UNION ALL SELECT 20, 'admin' ORDER BY Id;
             SELECT 1 AS UserId, 20 AS RoleId, 0 AS Seq
             UNION ALL SELECT 1, 10, 1
             ORDER BY Seq;",
        )
        .execute()
        .await?;

    let keys = JoinKeys::new("Id", "Id", "UserId", "RoleId");
    let members: Vec<Member> = result.map_many_to_many::<Member, Role, MemberRole>("Roles", &keys)?;
    let names: Vec<_> = members[0].roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["admin", "dev"]);
    assert!(members[1].roles.is_empty());

    let related: Vec<Member> = result.map_many_to_many_related::<Member, Role, MemberRole>()?;
    assert_eq!(related, members);
    Ok(())
}

#[tokio::test]
async fn duplicate_right_keys_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let client = client().await?;
    let result = client
        .query(
            "SELECT 1 AS Id;
             SELECT 10 AS Id, 'dev' AS Name UNION ALL SELECT 10, 'again';
             SELECT 1 AS UserId, 10 AS RoleId;",
        )
        .execute()
        .await?;

    let err = result
        .map_many_to_many::<Member, Role, MemberRole>(
            "Roles",
            &JoinKeys::new("Id", "Id", "UserId", "RoleId"),
        )
        .unwrap_err();
    assert!(matches!(
        err.assembly_failure(),
        Some(AssemblyFailure::DuplicateKey { .. })
    ));
    Ok(())
}
