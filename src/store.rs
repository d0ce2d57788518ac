//! Authoritative in-process store.
//!
//! Each entity lives in its own concurrent table keyed by an auto-increment
//! id. Person tables keep a unique e-mail index next to the rows.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::StoreError;
use crate::models::{
    AttendanceRecord, AttendanceStatus, Classroom, Exec, PaginatedQuery, SortOrder, Student,
    Teacher,
};

pub trait Record: Clone + Send + Sync + 'static {
    /// Fields a list may be ordered by, anything else falls back to `id asc`.
    const SORTABLE: &'static [&'static str];

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn touch(&mut self, now: DateTime<Utc>);

    fn email(&self) -> Option<&str> {
        None
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering;

    /// Case-insensitive match for `?search=`, `needle` is already lowercase.
    fn matches(&self, needle: &str) -> bool;
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

pub struct Table<T> {
    rows: DashMap<i64, T>,
    emails: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T: Record> Table<T> {
    pub fn create(&self, mut row: T) -> Result<T, StoreError> {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        row.set_id(id);

        if let Some(email) = row.email() {
            match self.emails.entry(email.to_lowercase()) {
                Entry::Occupied(_) => return Err(StoreError::Conflict("email already in use".into())),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        self.rows.insert(id, row.clone());
        Ok(row)
    }

    pub fn get(&self, id: i64) -> Result<T, StoreError> {
        self.rows
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(StoreError::NotFound)
    }

    pub fn exists(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn get_by_email(&self, email: &str) -> Result<T, StoreError> {
        let id = *self
            .emails
            .get(&email.to_lowercase())
            .ok_or(StoreError::NotFound)?;
        self.get(id)
    }

    pub fn list(&self, pq: &PaginatedQuery) -> Vec<T> {
        let needle = pq.search.as_deref().map(str::to_lowercase);
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|row| needle.as_deref().is_none_or(|n| row.matches(n)))
            .map(|row| row.value().clone())
            .collect();

        let pq = pq.normalized(T::SORTABLE);
        rows.sort_by(|a, b| {
            let ord = a.compare_by(b, &pq.sort_by);
            let ord = match pq.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| a.id().cmp(&b.id()))
        });

        rows.into_iter().skip(pq.offset).take(pq.limit).collect()
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|row| pred(row.value()))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|r| r.id());
        rows
    }

    /// Replaces the stored row with the same id and bumps its update time.
    pub fn update(&self, mut row: T) -> Result<T, StoreError> {
        let mut current = self.rows.get_mut(&row.id()).ok_or(StoreError::NotFound)?;

        let old_email = current.email().map(str::to_lowercase);
        let new_email = row.email().map(str::to_lowercase);
        if let (Some(old), Some(new)) = (old_email, new_email) {
            if old != new {
                match self.emails.entry(new) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::Conflict("email already in use".into()));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(row.id());
                    }
                }
                self.emails.remove(&old);
            }
        }

        row.touch(Utc::now());
        *current = row.clone();
        Ok(row)
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let (_, row) = self.rows.remove(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = row.email() {
            self.emails.remove(&email.to_lowercase());
        }
        Ok(())
    }
}

impl Record for Exec {
    const SORTABLE: &'static [&'static str] =
        &["id", "first_name", "last_name", "email", "role", "created_at", "updated_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "first_name" => self.first_name.cmp(&other.first_name),
            "last_name" => self.last_name.cmp(&other.last_name),
            "email" => self.email.cmp(&other.email),
            "role" => self.role.cmp(&other.role),
            "created_at" => self.created_at.cmp(&other.created_at),
            "updated_at" => self.updated_at.cmp(&other.updated_at),
            _ => self.id.cmp(&other.id),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains(&self.first_name, needle)
            || contains(&self.last_name, needle)
            || contains(&self.email, needle)
    }
}

impl Record for Teacher {
    const SORTABLE: &'static [&'static str] = &[
        "id", "first_name", "last_name", "email", "subject", "hire_date", "created_at", "updated_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "first_name" => self.first_name.cmp(&other.first_name),
            "last_name" => self.last_name.cmp(&other.last_name),
            "email" => self.email.cmp(&other.email),
            "subject" => self.subject.cmp(&other.subject),
            "hire_date" => self.hire_date.cmp(&other.hire_date),
            "created_at" => self.created_at.cmp(&other.created_at),
            "updated_at" => self.updated_at.cmp(&other.updated_at),
            _ => self.id.cmp(&other.id),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains(&self.first_name, needle)
            || contains(&self.last_name, needle)
            || contains(&self.email, needle)
            || contains(&self.subject, needle)
    }
}

impl Record for Student {
    const SORTABLE: &'static [&'static str] = &[
        "id", "first_name", "last_name", "email", "birth_date", "created_at", "updated_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "first_name" => self.first_name.cmp(&other.first_name),
            "last_name" => self.last_name.cmp(&other.last_name),
            "email" => self.email.cmp(&other.email),
            "birth_date" => self.birth_date.cmp(&other.birth_date),
            "created_at" => self.created_at.cmp(&other.created_at),
            "updated_at" => self.updated_at.cmp(&other.updated_at),
            _ => self.id.cmp(&other.id),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains(&self.first_name, needle)
            || contains(&self.last_name, needle)
            || contains(&self.email, needle)
    }
}

impl Record for Classroom {
    const SORTABLE: &'static [&'static str] =
        &["id", "name", "capacity", "grade", "created_at", "updated_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn compare_by(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "name" => self.name.cmp(&other.name),
            "capacity" => self.capacity.cmp(&other.capacity),
            "grade" => self.grade.cmp(&other.grade),
            "created_at" => self.created_at.cmp(&other.created_at),
            "updated_at" => self.updated_at.cmp(&other.updated_at),
            _ => self.id.cmp(&other.id),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        contains(&self.name, needle)
    }
}

/// Attendance rows, at most one per student per day.
#[derive(Default)]
pub struct AttendanceTable {
    rows: DashMap<i64, AttendanceRecord>,
    by_day: DashMap<(i64, NaiveDate), i64>,
    next_id: AtomicI64,
}

impl AttendanceTable {
    /// Inserts the record or overwrites the one already stored for the same
    /// student and date, keeping its id and creation time.
    fn upsert(&self, mut rec: AttendanceRecord, keep_teacher: bool) -> AttendanceRecord {
        rec.note = rec.note.filter(|n| !n.trim().is_empty());

        match self.by_day.entry((rec.student_id, rec.date)) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                if let Some(mut existing) = self.rows.get_mut(&id) {
                    rec.id = id;
                    rec.created_at = existing.created_at;
                    if keep_teacher {
                        rec.teacher_id = existing.teacher_id;
                    }
                    *existing = rec.clone();
                }
                rec
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1;
                rec.id = id;
                rec.created_at = Utc::now();
                slot.insert(id);
                self.rows.insert(id, rec.clone());
                rec
            }
        }
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let (_, rec) = self.rows.remove(&id).ok_or(StoreError::NotFound)?;
        self.by_day.remove(&(rec.student_id, rec.date));
        Ok(())
    }

    /// Removes every record of the student, returns how many went.
    fn delete_for_student(&self, student_id: i64) -> usize {
        let ids: Vec<i64> = self
            .rows
            .iter()
            .filter(|r| r.student_id == student_id)
            .map(|r| r.id)
            .collect();

        ids.into_iter().filter(|id| self.delete(*id).is_ok()).count()
    }

    pub fn by_student(
        &self,
        student_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<AttendanceRecord> {
        let mut records: Vec<_> = self
            .rows
            .iter()
            .filter(|r| r.student_id == student_id)
            .filter(|r| from.is_none_or(|f| r.date >= f) && to.is_none_or(|t| r.date <= t))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| (r.date, r.id));
        records
    }

    pub fn by_classroom_date(&self, classroom_id: i64, date: NaiveDate) -> Vec<AttendanceRecord> {
        let mut records: Vec<_> = self
            .rows
            .iter()
            .filter(|r| r.classroom_id == Some(classroom_id) && r.date == date)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.student_id);
        records
    }
}

#[derive(Default)]
pub struct Store {
    pub execs: Table<Exec>,
    pub teachers: Table<Teacher>,
    pub students: Table<Student>,
    pub classrooms: Table<Classroom>,
    pub attendance: AttendanceTable,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_student_refs(&self, student: &Student) -> Result<(), StoreError> {
        if !self.teachers.exists(student.teacher_id) {
            return Err(StoreError::MissingReference("teacher"));
        }
        if !self.classrooms.exists(student.classroom_id) {
            return Err(StoreError::MissingReference("classroom"));
        }
        Ok(())
    }

    pub fn create_student(&self, student: Student) -> Result<Student, StoreError> {
        self.check_student_refs(&student)?;
        self.students.create(student)
    }

    pub fn update_student(&self, student: Student) -> Result<Student, StoreError> {
        self.check_student_refs(&student)?;
        self.students.update(student)
    }

    pub fn students_by_teacher(&self, teacher_id: i64) -> Result<Vec<Student>, StoreError> {
        if !self.teachers.exists(teacher_id) {
            return Err(StoreError::NotFound);
        }
        Ok(self.students.filter(|s| s.teacher_id == teacher_id))
    }

    /// Refuses while students or classrooms still point at the teacher.
    pub fn delete_teacher(&self, id: i64) -> Result<(), StoreError> {
        if !self.teachers.exists(id) {
            return Err(StoreError::NotFound);
        }
        if !self.students.filter(|s| s.teacher_id == id).is_empty()
            || !self.classrooms.filter(|c| c.teacher_id == id).is_empty()
        {
            return Err(StoreError::Conflict(
                "teacher still has students or classrooms".into(),
            ));
        }
        self.teachers.delete(id)
    }

    /// Refuses while students are still assigned to the classroom.
    pub fn delete_classroom(&self, id: i64) -> Result<(), StoreError> {
        if !self.classrooms.exists(id) {
            return Err(StoreError::NotFound);
        }
        if !self.students.filter(|s| s.classroom_id == id).is_empty() {
            return Err(StoreError::Conflict("classroom still has students".into()));
        }
        self.classrooms.delete(id)
    }

    /// Deletes the student together with their attendance history.
    pub fn delete_student(&self, id: i64) -> Result<(), StoreError> {
        self.students.delete(id)?;
        self.attendance.delete_for_student(id);
        Ok(())
    }

    pub fn create_classroom(&self, classroom: Classroom) -> Result<Classroom, StoreError> {
        if !self.teachers.exists(classroom.teacher_id) {
            return Err(StoreError::MissingReference("teacher"));
        }
        self.classrooms.create(classroom)
    }

    pub fn update_classroom(&self, classroom: Classroom) -> Result<Classroom, StoreError> {
        if !self.teachers.exists(classroom.teacher_id) {
            return Err(StoreError::MissingReference("teacher"));
        }
        self.classrooms.update(classroom)
    }

    pub fn mark_attendance(&self, rec: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        if !self.students.exists(rec.student_id) {
            return Err(StoreError::MissingReference("student"));
        }
        if rec.classroom_id.is_some_and(|id| !self.classrooms.exists(id)) {
            return Err(StoreError::MissingReference("classroom"));
        }
        Ok(self.attendance.upsert(rec, false))
    }

    /// Marks a whole classroom for one day. Every student is checked before
    /// anything is written.
    pub fn bulk_mark_attendance(
        &self,
        classroom_id: i64,
        date: NaiveDate,
        statuses: &HashMap<i64, AttendanceStatus>,
    ) -> Result<(), StoreError> {
        if !self.classrooms.exists(classroom_id) {
            return Err(StoreError::MissingReference("classroom"));
        }
        if statuses.keys().any(|id| !self.students.exists(*id)) {
            return Err(StoreError::MissingReference("student"));
        }

        for (&student_id, &status) in statuses {
            self.attendance.upsert(
                AttendanceRecord {
                    id: 0,
                    student_id,
                    teacher_id: None,
                    classroom_id: Some(classroom_id),
                    date,
                    status,
                    note: None,
                    created_at: Utc::now(),
                },
                true,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Role;

    pub(crate) fn exec(email: &str) -> Exec {
        let now = Utc::now();
        Exec {
            id: 0,
            first_name: "Nima".into(),
            last_name: "Ahmadi".into(),
            email: email.into(),
            password_hash: String::new(),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn teacher(email: &str) -> Teacher {
        let now = Utc::now();
        Teacher {
            id: 0,
            first_name: "Mina".into(),
            last_name: "Sadeghi".into(),
            email: email.into(),
            password_hash: String::new(),
            subject: "Math".into(),
            phone_number: "+15550101".into(),
            hire_date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn classroom(teacher_id: i64) -> Classroom {
        let now = Utc::now();
        Classroom {
            id: 0,
            name: "7-B".into(),
            capacity: 30,
            grade: 7,
            teacher_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn student(email: &str, first_name: &str, teacher_id: i64, classroom_id: i64) -> Student {
        let now = Utc::now();
        Student {
            id: 0,
            first_name: first_name.into(),
            last_name: "Moradi".into(),
            email: email.into(),
            password_hash: String::new(),
            phone_number: None,
            classroom_id,
            birth_date: NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
            address: "1 Main St".into(),
            parent_name: "Ali".into(),
            parent_phone_number: "+15550102".into(),
            teacher_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> (Store, Teacher, Classroom) {
        let store = Store::new();
        let t = store.teachers.create(teacher("mina@school.test")).unwrap();
        let c = store.create_classroom(classroom(t.id)).unwrap();
        (store, t, c)
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let store = Store::new();
        let a = store.execs.create(exec("a@school.test")).unwrap();
        let b = store.execs.create(exec("b@school.test")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn duplicate_email_conflicts() {
        let store = Store::new();
        store.execs.create(exec("a@school.test")).unwrap();
        assert!(matches!(
            store.execs.create(exec("A@school.test")),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn email_index_follows_updates_and_deletes() {
        let store = Store::new();
        let mut a = store.execs.create(exec("a@school.test")).unwrap();
        store.execs.create(exec("b@school.test")).unwrap();

        a.email = "b@school.test".into();
        assert!(matches!(store.execs.update(a.clone()), Err(StoreError::Conflict(_))));

        a.email = "c@school.test".into();
        store.execs.update(a.clone()).unwrap();
        assert_eq!(store.execs.get_by_email("c@school.test").unwrap().id, a.id);
        assert_eq!(store.execs.get_by_email("a@school.test"), Err(StoreError::NotFound));

        store.execs.delete(a.id).unwrap();
        assert!(store.execs.create(exec("c@school.test")).is_ok());
    }

    #[test]
    fn list_sorts_paginates_and_searches() {
        let (store, t, c) = seeded();
        for (i, name) in ["Cyrus", "Arash", "Bita"].iter().enumerate() {
            store
                .create_student(student(&format!("s{i}@school.test"), name, t.id, c.id))
                .unwrap();
        }

        let pq = PaginatedQuery {
            sort_by: "first_name".into(),
            order: SortOrder::Desc,
            limit: 2,
            ..Default::default()
        };
        let names: Vec<_> = store.students.list(&pq).into_iter().map(|s| s.first_name).collect();
        assert_eq!(names, ["Cyrus", "Bita"]);

        let pq = PaginatedQuery {
            search: Some("ARA".into()),
            ..Default::default()
        };
        assert_eq!(store.students.list(&pq).len(), 1);

        let pq = PaginatedQuery {
            sort_by: "password_hash; DROP".into(),
            order: SortOrder::Desc,
            ..Default::default()
        };
        let ids: Vec<_> = store.students.list(&pq).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn students_need_existing_teacher_and_classroom() {
        let (store, t, _) = seeded();
        assert_eq!(
            store.create_student(student("x@school.test", "X", t.id, 99)),
            Err(StoreError::MissingReference("classroom"))
        );
        assert_eq!(
            store.create_student(student("x@school.test", "X", 99, 1)),
            Err(StoreError::MissingReference("teacher"))
        );
    }

    #[test]
    fn students_by_teacher_filters() {
        let (store, t, c) = seeded();
        let other = store.teachers.create(teacher("other@school.test")).unwrap();
        store.create_student(student("a@school.test", "A", t.id, c.id)).unwrap();
        store.create_student(student("b@school.test", "B", other.id, c.id)).unwrap();

        let mine = store.students_by_teacher(t.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].first_name, "A");
        assert_eq!(store.students_by_teacher(404), Err(StoreError::NotFound));
    }

    #[test]
    fn referenced_teacher_and_classroom_cannot_be_deleted() {
        let (store, t, c) = seeded();
        let s = store.create_student(student("a@school.test", "A", t.id, c.id)).unwrap();

        assert!(matches!(store.delete_teacher(t.id), Err(StoreError::Conflict(_))));
        assert!(matches!(store.delete_classroom(c.id), Err(StoreError::Conflict(_))));
        assert_eq!(store.students_by_teacher(t.id).unwrap().len(), 1);

        store.delete_student(s.id).unwrap();
        store.delete_classroom(c.id).unwrap();
        store.delete_teacher(t.id).unwrap();
        assert_eq!(store.delete_teacher(t.id), Err(StoreError::NotFound));
    }

    #[test]
    fn deleting_a_student_drops_their_attendance() {
        let (store, t, c) = seeded();
        let s = store.create_student(student("a@school.test", "A", t.id, c.id)).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        store
            .bulk_mark_attendance(c.id, day, &HashMap::from([(s.id, AttendanceStatus::Present)]))
            .unwrap();

        store.delete_student(s.id).unwrap();
        assert!(store.attendance.by_classroom_date(c.id, day).is_empty());
    }

    #[test]
    fn attendance_upserts_per_student_and_day() {
        let (store, t, c) = seeded();
        let s = store.create_student(student("a@school.test", "A", t.id, c.id)).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let rec = AttendanceRecord {
            id: 0,
            student_id: s.id,
            teacher_id: Some(t.id),
            classroom_id: Some(c.id),
            date: day,
            status: AttendanceStatus::Absent,
            note: Some("  ".into()),
            created_at: Utc::now(),
        };
        let first = store.mark_attendance(rec.clone()).unwrap();
        assert_eq!(first.note, None);

        let statuses = HashMap::from([(s.id, AttendanceStatus::Late)]);
        store.bulk_mark_attendance(c.id, day, &statuses).unwrap();

        let records = store.attendance.by_classroom_date(c.id, day);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, first.id);
        assert_eq!(records[0].status, AttendanceStatus::Late);
        assert_eq!(records[0].teacher_id, Some(t.id));

        let next_day = day.succ_opt().unwrap();
        store
            .mark_attendance(AttendanceRecord { date: next_day, ..rec })
            .unwrap();
        assert_eq!(store.attendance.by_student(s.id, None, None).len(), 2);
        assert_eq!(store.attendance.by_student(s.id, Some(next_day), None).len(), 1);
    }

    #[test]
    fn bulk_mark_rejects_unknown_students_before_writing() {
        let (store, t, c) = seeded();
        let s = store.create_student(student("a@school.test", "A", t.id, c.id)).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let statuses = HashMap::from([
            (s.id, AttendanceStatus::Present),
            (999, AttendanceStatus::Present),
        ]);
        assert_eq!(
            store.bulk_mark_attendance(c.id, day, &statuses),
            Err(StoreError::MissingReference("student"))
        );
        assert!(store.attendance.by_classroom_date(c.id, day).is_empty());
    }
}
