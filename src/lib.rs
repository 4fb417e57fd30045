/*!
# Pizza Ranking Backend

A small HTTP backend that records pizza-tasting ratings and turns them into a
leaderboard, using a spreadsheet-shaped workbook as its only data store.

## Overview

Every request follows the same shape: read a whole sheet range, scan the
rows for a key, then either answer from the matching row, rewrite it in
place, or append a new one. The leaderboard groups every rating row by spot
and averages the scores.

## Architecture

### Store Layer
- **Gateway** - `get`, `update` and `append` over A1 ranges (`Sheet1!A:I`)
- **Workbook** - named sheets of string cells, kept in memory behind a mutex
- **Persistence** - gzip-compressed bincode file, rewritten after each change
- **Seeding** - optional CSV import for the spots sheet

### Engine Layer
- **Upsert** - scan-then-write per key, serialized through per-key locks
- **Lookup** - point lookups, history filters, existence checks
- **Aggregation** - per-spot averages rounded to one decimal, best first

### HTTP Layer
- **Routing** - axum router with CORS
- **Errors** - store failures become `500 {"error": ...}` with a fixed message

## Sheets

| Sheet | Columns |
|---|---|
| `Sheet1` | user key, spot, user name, crust, sauce, cheese, flavor, notes, timestamp |
| `PizzaSpots` | name, address, description, image, ranked |
| `UserMapping` | user key, display name |

Row 1 of every sheet is a header.

## REST API Endpoints

- `POST /submit-rating` - Create or update a rating, flag the spot ranked
- `GET /get-user-ratings` - A user's rating history
- `POST /set-name` - Set a user's display name
- `POST /get-username` - A user's display name, registering new keys
- `GET /get-rating` - One rating, with defaults for unusable scores
- `GET /get-spots` - All spots plus the user's crust/sauce responses
- `POST /update-ranked` - Flag a spot ranked
- `GET /get-leaderboard` - Averages per spot, best first
- `POST /verify-code` - Whether a user key is known
*/

pub mod aggregate;
pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod locks;
pub mod lookup;
pub mod range;
pub mod rows;
pub mod saving;
pub mod score;
pub mod service;
pub mod upsert;
pub mod workbook;

pub use gateway::{GatewayError, Row, SheetGateway};
pub use range::SheetRange;
pub use service::RankingService;
pub use workbook::{Workbook, WorkbookGateway};
