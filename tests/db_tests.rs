// Store tests
// List operations through DB: key lifecycle, type checks, notifications, stats.

use std::cell::RefCell;
use std::rc::Rc;

use list_engine::keyspace::ObjectKind;
use list_engine::notify::{Event, KeyspaceObserver};
use list_engine::{DB, DbIndex, End, Error, InsertOutcome, ListEncoding, Options, Position};

type Log = Rc<RefCell<Vec<(Event, DbIndex, Vec<u8>)>>>;

struct Recorder(Log);

impl KeyspaceObserver for Recorder {
    fn notify(&self, event: Event, db: DbIndex, key: &[u8]) {
        self.0.borrow_mut().push((event, db, key.to_vec()));
    }
}

fn recorded_db(options: Options) -> (DB, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let db = DB::with_observer(options, Box::new(Recorder(log.clone())));
    (db, log)
}

fn events(log: &Log) -> Vec<Event> {
    log.borrow().iter().map(|(e, _, _)| *e).collect()
}

fn strs(values: Vec<Vec<u8>>) -> Vec<String> {
    values.into_iter().map(|v| String::from_utf8(v).unwrap()).collect()
}

// =============================================================================
// Test 1: Push creates the key, popping the last element removes it
// =============================================================================
#[test]
fn key_lifecycle() {
    let mut db = DB::new(Options::default());
    assert!(!db.exists(0, b"k").unwrap());
    assert_eq!(db.push(0, b"k", &[b"a", b"b"], End::Tail).unwrap(), 2);
    assert_eq!(db.kind_of(0, b"k").unwrap(), Some(ObjectKind::List));
    assert_eq!(db.pop(0, b"k", End::Head).unwrap(), Some(b"a".to_vec()));
    assert_eq!(db.pop(0, b"k", End::Head).unwrap(), Some(b"b".to_vec()));
    assert!(!db.exists(0, b"k").unwrap());
    assert_eq!(db.pop(0, b"k", End::Head).unwrap(), None);
    assert_eq!(db.len(0, b"k").unwrap(), 0);
}

// =============================================================================
// Test 2: Head pushes land in reverse argument order
// =============================================================================
#[test]
fn multi_value_head_push() {
    let mut db = DB::new(Options::default());
    db.push(0, b"k", &[b"a", b"b", b"c"], End::Head).unwrap();
    assert_eq!(strs(db.range(0, b"k", 0, -1).unwrap()), vec!["c", "b", "a"]);
}

// =============================================================================
// Test 3: Every list operation refuses a non-list key
// =============================================================================
#[test]
fn wrong_type_everywhere() {
    let mut db = DB::new(Options::default());
    db.set_string(0, b"s", b"v").unwrap();
    assert_eq!(db.push(0, b"s", &[b"x"], End::Tail), Err(Error::WrongType));
    assert_eq!(db.push_existing(0, b"s", b"x", End::Tail), Err(Error::WrongType));
    assert_eq!(db.pop(0, b"s", End::Head), Err(Error::WrongType));
    assert_eq!(db.len(0, b"s"), Err(Error::WrongType));
    assert_eq!(db.index(0, b"s", 0), Err(Error::WrongType));
    assert_eq!(db.set(0, b"s", 0, b"x"), Err(Error::WrongType));
    assert_eq!(db.insert(0, b"s", Position::Before, b"v", b"x"), Err(Error::WrongType));
    assert_eq!(db.range(0, b"s", 0, -1), Err(Error::WrongType));
    assert_eq!(db.trim(0, b"s", 0, 1), Err(Error::WrongType));
    assert_eq!(db.remove(0, b"s", 0, b"v"), Err(Error::WrongType));
    assert_eq!(db.encoding_of(0, b"s"), Err(Error::WrongType));
    assert_eq!(db.get_string(0, b"s").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Test 4: Index-set errors
// =============================================================================
#[test]
fn set_errors() {
    let mut db = DB::new(Options::default());
    assert_eq!(db.set(0, b"k", 0, b"x"), Err(Error::NoSuchKey));
    db.push(0, b"k", &[b"a", b"b"], End::Tail).unwrap();
    assert_eq!(db.set(0, b"k", 2, b"x"), Err(Error::OutOfRange));
    assert_eq!(db.set(0, b"k", -3, b"x"), Err(Error::OutOfRange));
    db.set(0, b"k", -1, b"B").unwrap();
    assert_eq!(db.index(0, b"k", 1).unwrap(), Some(b"B".to_vec()));
}

// =============================================================================
// Test 5: Insert outcomes
// =============================================================================
#[test]
fn insert_outcomes() {
    let mut db = DB::new(Options::default());
    assert_eq!(
        db.insert(0, b"k", Position::Before, b"p", b"x").unwrap(),
        InsertOutcome::NoSuchKey
    );
    db.push(0, b"k", &[b"a", b"c"], End::Tail).unwrap();
    assert_eq!(
        db.insert(0, b"k", Position::Before, b"zz", b"x").unwrap(),
        InsertOutcome::PivotNotFound
    );
    assert_eq!(
        db.insert(0, b"k", Position::After, b"a", b"b").unwrap(),
        InsertOutcome::Inserted(3)
    );
    assert_eq!(strs(db.range(0, b"k", 0, -1).unwrap()), vec!["a", "b", "c"]);
}

// =============================================================================
// Test 6: Push only to existing lists
// =============================================================================
#[test]
fn push_existing_only() {
    let mut db = DB::new(Options::default());
    assert_eq!(db.push_existing(0, b"k", b"x", End::Head).unwrap(), 0);
    assert!(!db.exists(0, b"k").unwrap());
    db.push(0, b"k", &[b"a"], End::Tail).unwrap();
    assert_eq!(db.push_existing(0, b"k", b"x", End::Head).unwrap(), 2);
}

// =============================================================================
// Test 7: Trim to nothing deletes the key
// =============================================================================
#[test]
fn trim_deletes_empty_list() {
    let mut db = DB::new(Options::default());
    db.push(0, b"k", &[b"a", b"b", b"c"], End::Tail).unwrap();
    db.trim(0, b"k", 1, 1).unwrap();
    assert_eq!(strs(db.range(0, b"k", 0, -1).unwrap()), vec!["b"]);
    db.trim(0, b"k", 5, 10).unwrap();
    assert!(!db.exists(0, b"k").unwrap());
}

// =============================================================================
// Test 8: Removing every occurrence deletes the key
// =============================================================================
#[test]
fn remove_deletes_empty_list() {
    let mut db = DB::new(Options::default());
    db.push(0, b"k", &[b"x", b"x"], End::Tail).unwrap();
    assert_eq!(db.remove(0, b"k", 0, b"x").unwrap(), 2);
    assert!(!db.exists(0, b"k").unwrap());
    assert_eq!(db.remove(0, b"k", 0, b"x").unwrap(), 0);
}

// =============================================================================
// Test 9: Pop-and-push moves tail to head, including onto itself
// =============================================================================
#[test]
fn pop_push_moves_tail_to_head() {
    let mut db = DB::new(Options::default());
    db.push(0, b"src", &[b"a", b"b"], End::Tail).unwrap();
    assert_eq!(db.pop_push(0, b"src", b"dst").unwrap(), Some(b"b".to_vec()));
    assert_eq!(db.pop_push(0, b"src", b"dst").unwrap(), Some(b"a".to_vec()));
    assert!(!db.exists(0, b"src").unwrap());
    assert_eq!(strs(db.range(0, b"dst", 0, -1).unwrap()), vec!["a", "b"]);
    assert_eq!(db.pop_push(0, b"src", b"dst").unwrap(), None);

    // Rotation
    db.push(0, b"dst", &[b"c"], End::Tail).unwrap();
    assert_eq!(db.pop_push(0, b"dst", b"dst").unwrap(), Some(b"c".to_vec()));
    assert_eq!(strs(db.range(0, b"dst", 0, -1).unwrap()), vec!["c", "a", "b"]);
}

// =============================================================================
// Test 10: Pop-and-push to a non-list destination changes nothing
// =============================================================================
#[test]
fn pop_push_wrong_type_destination() {
    let mut db = DB::new(Options::default());
    db.push(0, b"src", &[b"a"], End::Tail).unwrap();
    db.set_string(0, b"dst", b"v").unwrap();
    assert_eq!(db.pop_push(0, b"src", b"dst"), Err(Error::WrongType));
    assert_eq!(strs(db.range(0, b"src", 0, -1).unwrap()), vec!["a"]);
}

// =============================================================================
// Test 11: Databases are isolated
// =============================================================================
#[test]
fn databases_isolated() {
    let mut db = DB::new(Options::default().with_databases(2));
    db.push(0, b"k", &[b"zero"], End::Tail).unwrap();
    db.push(1, b"k", &[b"one"], End::Tail).unwrap();
    assert_eq!(db.index(0, b"k", 0).unwrap(), Some(b"zero".to_vec()));
    assert_eq!(db.index(1, b"k", 0).unwrap(), Some(b"one".to_vec()));
    assert_eq!(db.len(2, b"k"), Err(Error::InvalidDb(2)));
}

// =============================================================================
// Test 12: Notifications follow successful mutations only
// =============================================================================
#[test]
fn notifications() {
    let (mut db, log) = recorded_db(Options::default());
    db.push(0, b"k", &[b"a", b"b"], End::Tail).unwrap();
    db.push(0, b"k", &[b"z"], End::Head).unwrap();
    db.set(0, b"k", 0, b"Z").unwrap();
    db.insert(0, b"k", Position::After, b"a", b"x").unwrap();
    db.insert(0, b"k", Position::After, b"missing", b"x").unwrap();
    db.remove(0, b"k", 0, b"missing").unwrap();
    db.remove(0, b"k", 1, b"x").unwrap();
    db.trim(0, b"k", 0, -1).unwrap();
    db.pop(0, b"k", End::Tail).unwrap();
    db.pop(0, b"k", End::Head).unwrap();
    db.pop(0, b"k", End::Head).unwrap();
    db.pop(0, b"k", End::Head).unwrap();
    assert_eq!(
        events(&log),
        vec![
            Event::RPush,
            Event::LPush,
            Event::LSet,
            Event::LInsert,
            Event::LRem,
            Event::LTrim,
            Event::RPop,
            Event::LPop,
            Event::LPop,
            Event::Del,
        ]
    );
    assert!(log.borrow().iter().all(|(_, db, key)| *db == 0 && key == b"k"));
    assert_eq!(Event::LInsert.name(), "linsert");
}

// =============================================================================
// Test 13: Stats count conversions and keys
// =============================================================================
#[test]
fn stats() {
    let mut db = DB::new(Options::default().with_max_compact_entries(2).with_max_compact_value(4));
    db.push(0, b"a", &[b"1", b"2", b"3"], End::Tail).unwrap();
    db.push(0, b"b", &[b"1"], End::Tail).unwrap();
    db.set(0, b"b", 0, b"long value").unwrap();
    db.push(0, b"c", &[b"1"], End::Tail).unwrap();
    db.insert(0, b"c", Position::Before, b"1", b"long value").unwrap();
    db.set_string(0, b"s", b"v").unwrap();
    let stats = db.stats();
    assert_eq!(stats.conversions, 3);
    assert_eq!(stats.keys, 4);
    assert_eq!(db.encoding_of(0, b"c").unwrap(), Some(ListEncoding::Linked));
}

// =============================================================================
// Test 14: Delete removes any kind of key
// =============================================================================
#[test]
fn delete_any_kind() {
    let (mut db, log) = recorded_db(Options::default());
    db.push(0, b"l", &[b"a"], End::Tail).unwrap();
    db.set_string(0, b"s", b"v").unwrap();
    assert!(db.delete(0, b"l").unwrap());
    assert!(db.delete(0, b"s").unwrap());
    assert!(!db.delete(0, b"s").unwrap());
    assert_eq!(events(&log), vec![Event::RPush, Event::Del, Event::Del]);
}
