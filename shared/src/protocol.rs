/// mDNS service type advertised by WLED LED controllers
pub const WLED_SERVICE_TYPE: &str = "_wled._tcp.local.";

/// Bookmarks Menu root in places.sqlite
pub const MENU_ROOT_ID: i64 = 1;

/// moz_bookmarks.type values
pub const TYPE_BOOKMARK: i64 = 1;
pub const TYPE_FOLDER: i64 = 2;

/// Default names for files the tool reads and writes
pub const PLACES_FILE_NAME: &str = "places.sqlite";
pub const BACKUP_FILE_NAME: &str = "places_backup.sqlite";
pub const DEFAULT_EXPORT_FILE: &str = "discovered_services.json";
pub const DEFAULT_LEDGER_FILE: &str = "bookmarks_added.json";
pub const DEFAULT_FOLDER_TITLE: &str = "LED Strips";
