use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::menu::WeeklyMenu;

/// The three writes the refresh flow needs from a record store.
pub trait MenuStore {
    /// Id of the restaurant keyed by `domain`, creating it on first sight.
    fn upsert_restaurant(&self, domain: &str, url: &str) -> Result<i64>;
    fn delete_menus_for_week(&self, restaurant_id: i64, week_start: NaiveDate) -> Result<usize>;
    fn insert_menu(&self, restaurant_id: i64, week_start: NaiveDate, menu: &WeeklyMenu) -> Result<()>;

    /// Swap whatever is stored for that week with `menu`.
    fn replace_week(&self, restaurant_id: i64, week_start: NaiveDate, menu: &WeeklyMenu) -> Result<()> {
        self.delete_menus_for_week(restaurant_id, week_start)?;
        self.insert_menu(restaurant_id, week_start, menu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restaurant {
    pub id: i64,
    pub domain: String,
    pub full_url: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct StoredMenu {
    pub restaurant: Restaurant,
    pub week_start: NaiveDate,
    pub menu: WeeklyMenu,
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn restaurants(&self) -> Result<Vec<Restaurant>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, domain, full_url, name FROM restaurants ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Restaurant {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    full_url: row.get(2)?,
                    name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest stored menu per restaurant for the given week.
    pub fn menus_for_week(&self, week_start: NaiveDate) -> Result<Vec<StoredMenu>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.domain, r.full_url, r.name, m.data
             FROM daily_menus m JOIN restaurants r ON r.id = m.restaurant_id
             WHERE m.week_start = ?1
             ORDER BY r.name, m.id DESC",
        )?;
        let rows = stmt
            .query_map([week_start.to_string()], |row| {
                Ok((
                    Restaurant {
                        id: row.get(0)?,
                        domain: row.get(1)?,
                        full_url: row.get(2)?,
                        name: row.get(3)?,
                    },
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut menus: Vec<StoredMenu> = Vec::new();
        for (restaurant, data) in rows {
            if menus.iter().any(|m| m.restaurant.id == restaurant.id) {
                continue;
            }
            let menu = serde_json::from_str(&data)
                .with_context(|| format!("Corrupt menu JSON for {}", restaurant.domain))?;
            menus.push(StoredMenu { restaurant, week_start, menu });
        }
        Ok(menus)
    }

    /// Delete a restaurant and all its menus. Returns false if it was unknown.
    pub fn remove_restaurant(&self, domain: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let id: Option<i64> = tx
            .query_row("SELECT id FROM restaurants WHERE domain = ?1", [domain], |row| row.get(0))
            .optional()?;
        let Some(id) = id else {
            return Ok(false);
        };
        tx.execute("DELETE FROM daily_menus WHERE restaurant_id = ?1", [id])?;
        tx.execute("DELETE FROM restaurants WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(true)
    }
}

impl MenuStore for SqliteStore {
    fn upsert_restaurant(&self, domain: &str, url: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO restaurants (domain, full_url, name) VALUES (?1, ?2, ?1)",
            [domain, url],
        )?;
        let id = self
            .conn
            .query_row("SELECT id FROM restaurants WHERE domain = ?1", [domain], |row| row.get(0))?;
        Ok(id)
    }

    fn delete_menus_for_week(&self, restaurant_id: i64, week_start: NaiveDate) -> Result<usize> {
        delete_week(&self.conn, restaurant_id, week_start)
    }

    fn insert_menu(&self, restaurant_id: i64, week_start: NaiveDate, menu: &WeeklyMenu) -> Result<()> {
        insert_week(&self.conn, restaurant_id, week_start, menu)
    }

    /// Old menu stays in place if the new one cannot be written.
    fn replace_week(&self, restaurant_id: i64, week_start: NaiveDate, menu: &WeeklyMenu) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        delete_week(&tx, restaurant_id, week_start)?;
        insert_week(&tx, restaurant_id, week_start, menu)?;
        tx.commit()?;
        Ok(())
    }
}

fn delete_week(conn: &Connection, restaurant_id: i64, week_start: NaiveDate) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM daily_menus WHERE restaurant_id = ?1 AND week_start = ?2",
        rusqlite::params![restaurant_id, week_start.to_string()],
    )?;
    Ok(n)
}

fn insert_week(conn: &Connection, restaurant_id: i64, week_start: NaiveDate, menu: &WeeklyMenu) -> Result<()> {
    conn.execute(
        "INSERT INTO daily_menus (restaurant_id, week_start, data) VALUES (?1, ?2, ?3)",
        rusqlite::params![restaurant_id, week_start.to_string(), serde_json::to_string(menu)?],
    )?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS restaurants (
            id         INTEGER PRIMARY KEY,
            domain     TEXT UNIQUE NOT NULL,
            full_url   TEXT NOT NULL,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS daily_menus (
            id            INTEGER PRIMARY KEY,
            restaurant_id INTEGER NOT NULL REFERENCES restaurants(id),
            week_start    TEXT NOT NULL,
            data          TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_menus_week ON daily_menus(week_start);
        CREATE INDEX IF NOT EXISTS idx_menus_restaurant ON daily_menus(restaurant_id, week_start);
        ",
    )?;
    Ok(())
}

// ── Tests ──
