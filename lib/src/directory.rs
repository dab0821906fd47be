// lib/src/directory.rs

//! Patient, staff and department lookups owned by other systems. The engine
//! only needs existence checks and display summaries.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use tokio::sync::RwLock;

use models::medical::{DepartmentSummary, PatientSummary, Role, StaffMember};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn exists(&self, patient_id: &str) -> Result<bool>;
    async fn find(&self, patient_id: &str) -> Result<Option<PatientSummary>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// True if a staff member with this id holds `role`.
    async fn exists(&self, user_id: &str, role: Role) -> Result<bool>;
    async fn find(&self, user_id: &str) -> Result<Option<StaffMember>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find(&self, department_id: &str) -> Result<Option<DepartmentSummary>>;
}

/// The three collaborators a visit service consults.
#[derive(Clone)]
pub struct Directory {
    pub patients: Arc<dyn PatientRepository>,
    pub users: Arc<dyn UserRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
}

impl Directory {
    pub fn from_in_memory(directory: Arc<InMemoryDirectory>) -> Self {
        Directory {
            patients: directory.clone(),
            users: directory.clone(),
            departments: directory,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub patients: Vec<PatientSummary>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub departments: Vec<DepartmentSummary>,
}

impl DirectorySeed {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading directory seed {:?}", path))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing directory seed {:?}", path))
    }
}

/// Local stand-in for the patient registry and staff directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashMap<String, PatientSummary>>,
    staff: RwLock<HashMap<String, StaffMember>>,
    departments: RwLock<HashMap<String, DepartmentSummary>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        info!(
            "Seeding directory with {} patient(s), {} staff, {} department(s)",
            seed.patients.len(),
            seed.staff.len(),
            seed.departments.len()
        );
        InMemoryDirectory {
            patients: RwLock::new(seed.patients.into_iter().map(|p| (p.id.clone(), p)).collect()),
            staff: RwLock::new(seed.staff.into_iter().map(|s| (s.id.clone(), s)).collect()),
            departments: RwLock::new(
                seed.departments.into_iter().map(|d| (d.id.clone(), d)).collect(),
            ),
        }
    }

    pub async fn add_patient(&self, patient: PatientSummary) {
        self.patients.write().await.insert(patient.id.clone(), patient);
    }

    pub async fn add_staff(&self, member: StaffMember) {
        self.staff.write().await.insert(member.id.clone(), member);
    }

    pub async fn add_department(&self, department: DepartmentSummary) {
        self.departments.write().await.insert(department.id.clone(), department);
    }
}

#[async_trait]
impl PatientRepository for InMemoryDirectory {
    async fn exists(&self, patient_id: &str) -> Result<bool> {
        Ok(self.patients.read().await.contains_key(patient_id))
    }

    async fn find(&self, patient_id: &str) -> Result<Option<PatientSummary>> {
        Ok(self.patients.read().await.get(patient_id).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryDirectory {
    async fn exists(&self, user_id: &str, role: Role) -> Result<bool> {
        Ok(self
            .staff
            .read()
            .await
            .get(user_id)
            .is_some_and(|s| s.role == role))
    }

    async fn find(&self, user_id: &str) -> Result<Option<StaffMember>> {
        Ok(self.staff.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl DepartmentRepository for InMemoryDirectory {
    async fn find(&self, department_id: &str) -> Result<Option<DepartmentSummary>> {
        Ok(self.departments.read().await.get(department_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn should_load_seed_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"patients:
  - id: p-1
    firstName: Ada
    lastName: Lovelace
staff:
  - id: d-1
    firstName: Gregory
    lastName: House
    role: doctor
  - id: n-1
    firstName: Carla
    lastName: Espinosa
    role: nurse
departments:
  - id: dep-1
    name: Cardiology
"#
        )
        .unwrap();
        let directory = InMemoryDirectory::from_seed(DirectorySeed::from_file(file.path()).unwrap());

        assert!(PatientRepository::exists(&directory, "p-1").await.unwrap());
        assert!(UserRepository::exists(&directory, "d-1", Role::Doctor).await.unwrap());
        assert!(!UserRepository::exists(&directory, "n-1", Role::Doctor).await.unwrap());
        assert_eq!(
            DepartmentRepository::find(&directory, "dep-1").await.unwrap().map(|d| d.name),
            Some("Cardiology".to_string())
        );
    }
}
