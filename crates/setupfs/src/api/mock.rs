//! In-memory backend with fault injection, used by unit tests
//!
//! Every acquire and release is recorded so tests can check unwind order and
//! that nothing is left open.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::{FileApi, ObjectKind, OpenRequest};
use crate::error::{NtStatus, OsError};
use crate::path::{PathBuffer, SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Stage {
    Open,
    QueryLength,
    CreateMapping,
    MapView,
    UnmapView,
    CloseSection,
    CloseFile,
}

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    File { data: Vec<u8>, length: u64 },
}

#[derive(Debug)]
pub(crate) struct MockFile {
    id: u32,
    data: Vec<u8>,
    length: u64,
}

#[derive(Debug)]
pub(crate) struct MockSection {
    id: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct MockView {
    id: u32,
    data: Vec<u8>,
}

impl AsRef<[u8]> for MockView {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Default)]
struct State {
    next_id: u32,
    files: BTreeSet<u32>,
    sections: BTreeSet<u32>,
    views: BTreeSet<u32>,
    events: Vec<String>,
    requests: Vec<(String, OpenRequest)>,
}

#[derive(Default)]
pub(crate) struct MockApi {
    entries: HashMap<String, Entry>,
    failing: HashSet<Stage>,
    state: RefCell<State>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dir(mut self, name: &str) -> Self {
        self.entries.insert(key(name), Entry::Dir);
        self
    }

    pub(crate) fn with_file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.insert(
            key(name),
            Entry::File {
                data: data.to_vec(),
                length: data.len() as u64,
            },
        );
        self
    }

    /// File whose reported length differs from its mapped contents
    pub(crate) fn with_sized_file(mut self, name: &str, data: &[u8], length: u64) -> Self {
        self.entries.insert(
            key(name),
            Entry::File {
                data: data.to_vec(),
                length,
            },
        );
        self
    }

    pub(crate) fn failing_at(mut self, stage: Stage) -> Self {
        self.failing.insert(stage);
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.state.borrow().events.clone()
    }

    pub(crate) fn requests(&self) -> Vec<(String, OpenRequest)> {
        self.state.borrow().requests.clone()
    }

    /// Number of files, sections and views currently held
    pub(crate) fn live(&self) -> (usize, usize, usize) {
        let state = self.state.borrow();
        (state.files.len(), state.sections.len(), state.views.len())
    }

    fn fail(&self, stage: Stage) -> Result<(), OsError> {
        if self.failing.contains(&stage) {
            self.state
                .borrow_mut()
                .events
                .push(format!("{stage:?} failed"));
            Err(NtStatus::ACCESS_DENIED.into())
        } else {
            Ok(())
        }
    }

    fn record(&self, event: String) {
        self.state.borrow_mut().events.push(event);
    }

    fn next_id(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }
}

fn key(name: &str) -> String {
    name.trim_matches(SEPARATOR).to_lowercase()
}

impl FileApi for MockApi {
    type Root = String;
    type File = MockFile;
    type Section = MockSection;
    type View = MockView;

    fn open_existing(
        &self,
        root: Option<&String>,
        name: &PathBuffer,
        request: OpenRequest,
    ) -> Result<MockFile, OsError> {
        let name = name.to_string_lossy();
        let full = match root {
            Some(root) => format!("{}{}{}", root, SEPARATOR, name),
            None => name,
        };
        self.state
            .borrow_mut()
            .requests
            .push((full.clone(), request));
        self.fail(Stage::Open)?;

        let entry = self
            .entries
            .get(&key(&full))
            .ok_or(OsError::Status(NtStatus::OBJECT_NAME_NOT_FOUND))?;
        let (data, length) = match (entry, request.kind) {
            (Entry::Dir, ObjectKind::Directory) => (Vec::new(), 0),
            (Entry::File { data, length }, ObjectKind::NonDirectory) => (data.clone(), *length),
            (Entry::Dir, ObjectKind::NonDirectory) => {
                return Err(NtStatus::FILE_IS_A_DIRECTORY.into());
            }
            (Entry::File { .. }, ObjectKind::Directory) => {
                return Err(NtStatus::NOT_A_DIRECTORY.into());
            }
        };

        let id = self.next_id();
        self.state.borrow_mut().files.insert(id);
        self.record(format!("open {id}"));
        Ok(MockFile { id, data, length })
    }

    fn close_file(&self, file: MockFile) -> Result<(), OsError> {
        self.record(format!("close file {}", file.id));
        self.fail(Stage::CloseFile)?;
        self.state.borrow_mut().files.remove(&file.id);
        Ok(())
    }

    fn query_file_length(&self, file: &MockFile) -> Result<u64, OsError> {
        self.record(format!("query {}", file.id));
        self.fail(Stage::QueryLength)?;
        Ok(file.length)
    }

    fn create_read_only_mapping(&self, file: &MockFile) -> Result<MockSection, OsError> {
        self.fail(Stage::CreateMapping)?;
        if file.data.is_empty() {
            return Err(NtStatus::MAPPED_FILE_SIZE_ZERO.into());
        }
        let id = self.next_id();
        self.state.borrow_mut().sections.insert(id);
        self.record(format!("section {id}"));
        Ok(MockSection {
            id,
            data: file.data.clone(),
        })
    }

    fn close_section(&self, section: MockSection) -> Result<(), OsError> {
        self.record(format!("close section {}", section.id));
        self.fail(Stage::CloseSection)?;
        self.state.borrow_mut().sections.remove(&section.id);
        Ok(())
    }

    fn map_view(&self, section: &MockSection) -> Result<MockView, OsError> {
        self.fail(Stage::MapView)?;
        let id = self.next_id();
        self.state.borrow_mut().views.insert(id);
        self.record(format!("view {id}"));
        Ok(MockView {
            id,
            data: section.data.clone(),
        })
    }

    fn unmap_view(&self, view: MockView) -> Result<(), OsError> {
        self.record(format!("unmap {}", view.id));
        self.fail(Stage::UnmapView)?;
        self.state.borrow_mut().views.remove(&view.id);
        Ok(())
    }

    fn open_root_directory(
        &self,
        root: Option<&String>,
        name: &PathBuffer,
    ) -> Result<String, OsError> {
        let dir = self.open_existing(root, name, OpenRequest::PROBE_DIRECTORY)?;
        self.close_file(dir)?;
        let name = name.to_string_lossy();
        Ok(match root {
            Some(root) => format!("{}{}{}", root, SEPARATOR, name),
            None => name,
        })
    }
}
