use async_trait::async_trait;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

#[derive(Clone)]
pub struct UserService {
  // gets
  user_by_id: VersionedStatement,
  user_by_email: VersionedStatement,
  user_by_username: VersionedStatement,
  profile_by_username: VersionedStatement,

  // writes
  insert_user: VersionedStatement,
  update_user: VersionedStatement,
  update_password: VersionedStatement,

  // follows
  follow: VersionedStatement,
  unfollow: VersionedStatement,
  is_following: VersionedStatement,
}

lazy_static! {
  static ref USER_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "users",
      columns: vec![
        generated("id"),
        column("username"),
        column("email"),
        column("password"),
        generated("bio"),
        generated("image"),
        generated("created_at"),
        generated("updated_at"),
      ],
    }
  };

  static ref FOLLOW_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "follows",
      columns: vec![
        column("follower_id"),
        column("followed_id"),
      ],
    }
  };
}

fn user_from_row(row: &Row) -> User {
  User {
    id: row.get(0),
    username: row.get(1),
    email: row.get(2),
    password: row.get(3),
    bio: row.get(4),
    image: row.get(5),
    created_at: row.get(6),
    updated_at: row.get(7),
  }
}

/// Columns: id, username, bio, image, following.
pub(crate) fn profile_from_row(row: &Row, offset: usize) -> Profile {
  Profile {
    user_id: row.get(offset),
    username: row.get(offset + 1),
    bio: row.get(offset + 2),
    image: row.get(offset + 3),
    following: row.get(offset + 4),
  }
}

/// Author projection for a viewer bound to `$1`.
pub(crate) static PROFILE_COLUMNS: &str = r#"u.id, u.username, u.bio, u.image,
  EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = u.id) AS following"#;

impl UserService {
  pub fn new(cl: SharedClient) -> Result<UserService> {
    let select = USER_COLUMNS.build_select_query();
    // Build user_by_* queries
    let user_by_id = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE id = $1"#, select))?;
    let user_by_email = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE email = $1"#, select))?;
    let user_by_username = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE username = $1"#, select))?;
    let profile_by_username = VersionedStatement::new(cl.clone(),
        &format!(r#"SELECT {} FROM users u WHERE u.username = $2"#, PROFILE_COLUMNS))?;

    let insert_user = VersionedStatement::new(cl.clone(),
        &USER_COLUMNS.build_insert_query("id"))?;
    let update_user = VersionedStatement::new(cl.clone(),
        r#"UPDATE users SET username = $2, email = $3, bio = $4, image = $5,
          password = COALESCE($6, password), updated_at = now()
        WHERE id = $1"#)?;
    let update_password = VersionedStatement::new(cl.clone(),
        r#"UPDATE users SET password = $2 WHERE id = $1"#)?;

    let follow = VersionedStatement::new(cl.clone(),
        &FOLLOW_COLUMNS.build_insert_ignore())?;
    let unfollow = VersionedStatement::new(cl.clone(),
        &FOLLOW_COLUMNS.build_delete_query())?;
    let is_following = VersionedStatement::new(cl.clone(),
        &FOLLOW_COLUMNS.build_exists_query())?;

    Ok(UserService {
      user_by_id,
      user_by_email,
      user_by_username,
      profile_by_username,

      insert_user,
      update_user,
      update_password,

      follow,
      unfollow,
      is_following,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.user_by_id.prepare().await?;
    self.user_by_email.prepare().await?;
    self.user_by_username.prepare().await?;
    self.profile_by_username.prepare().await?;

    self.insert_user.prepare().await?;
    self.update_user.prepare().await?;
    self.update_password.prepare().await?;

    self.follow.prepare().await?;
    self.unfollow.prepare().await?;
    self.is_following.prepare().await?;
    Ok(())
  }
}

#[async_trait(?Send)]
impl UserStore for UserService {
  async fn create(&self, user: &NewUser) -> Result<i32> {
    let row = self.insert_user.query_one(&[
      &user.username, &user.email, &user.password_hash,
    ]).await?;
    Ok(row.get(0))
  }

  async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
    let row = self.user_by_id.query_opt(&[&id]).await?;
    Ok(opt_row(&row, user_from_row))
  }

  async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
    let row = self.user_by_username.query_opt(&[&username]).await?;
    Ok(opt_row(&row, user_from_row))
  }

  async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
    let row = self.user_by_email.query_opt(&[&email]).await?;
    Ok(opt_row(&row, user_from_row))
  }

  async fn update(&self, id: i32, changes: &UserChanges) -> Result<bool> {
    let count = self.update_user.execute(&[
      &id, &changes.username, &changes.email, &changes.bio, &changes.image,
      &changes.password_hash,
    ]).await?;
    Ok(count > 0)
  }

  async fn update_password(&self, id: i32, password_hash: &str) -> Result<()> {
    self.update_password.execute(&[&id, &password_hash]).await?;
    Ok(())
  }

  async fn profile(&self, viewer: Option<i32>, username: &str) -> Result<Option<Profile>> {
    let row = self.profile_by_username.query_opt(&[&viewer, &username]).await?;
    Ok(opt_row(&row, |row| profile_from_row(row, 0)))
  }

  async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<()> {
    self.follow.execute(&[&follower_id, &followed_id]).await?;
    Ok(())
  }

  async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<()> {
    self.unfollow.execute(&[&follower_id, &followed_id]).await?;
    Ok(())
  }

  async fn is_following(&self, follower_id: i32, followed_id: i32) -> Result<bool> {
    let row = self.is_following.query_one(&[&follower_id, &followed_id]).await?;
    Ok(row.get(0))
  }
}
