//! Role/location assignment form for a staff user.
//!
//! The form holds rows of one role plus the locations where the user holds
//! it. On submit the rows are flattened into one [`AssignmentPair`] per
//! location per role, the shape `PUT /users/{id}/assignments` expects.

use std::collections::BTreeSet;

use thiserror::Error;

use tavola_core::types::staff::{grantable_roles, validate_assignment_pairs};
use tavola_core::validation::ValidationError;
use tavola_core::{ActorTier, AssignmentPair, FieldErrors, LocationId, Role, RoleId, StaffUser};

/// Form-level error path, as used by the server.
pub const FORM_ERROR_PATH: &str = "assignments";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("O usuário precisa de ao menos uma função")]
    LastRow,

    #[error("Esta função já foi atribuída")]
    DuplicateRole,

    #[error("Linha inexistente: {0}")]
    NoSuchRow(usize),
}

/// One role and the locations where it applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentRow {
    pub role_id: Option<RoleId>,
    pub location_ids: BTreeSet<LocationId>,
}

#[derive(Debug, Clone)]
pub struct AssignmentForm {
    rows: Vec<AssignmentRow>,
    tier: ActorTier,
    errors: FieldErrors,
}

impl AssignmentForm {
    /// A form with one empty row, filled in by a user of `tier`.
    #[must_use]
    pub fn new(tier: ActorTier) -> Self {
        Self {
            rows: vec![AssignmentRow::default()],
            tier,
            errors: FieldErrors::new(),
        }
    }

    /// Rows for an existing user, one per role in first-seen order.
    /// Restaurant-wide assignments give a row without locations.
    #[must_use]
    pub fn from_user(user: &StaffUser, tier: ActorTier) -> Self {
        let mut rows: Vec<AssignmentRow> = Vec::new();
        for assignment in &user.assignments {
            let index = match rows
                .iter()
                .position(|row| row.role_id == Some(assignment.role_id))
            {
                Some(index) => index,
                None => {
                    rows.push(AssignmentRow {
                        role_id: Some(assignment.role_id),
                        location_ids: BTreeSet::new(),
                    });
                    rows.len() - 1
                }
            };
            if let (Some(location_id), Some(row)) = (assignment.location_id, rows.get_mut(index)) {
                row.location_ids.insert(location_id);
            }
        }
        if rows.is_empty() {
            rows.push(AssignmentRow::default());
        }
        Self {
            rows,
            tier,
            errors: FieldErrors::new(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[AssignmentRow] {
        &self.rows
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut AssignmentRow, AssignmentError> {
        self.rows
            .get_mut(index)
            .ok_or(AssignmentError::NoSuchRow(index))
    }

    /// Append an empty row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(AssignmentRow::default());
        self.errors.remove(FORM_ERROR_PATH);
        self.rows.len() - 1
    }

    /// Remove a row. The last row stays and gets an inline error instead.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::LastRow` for the only row.
    pub fn remove_row(&mut self, index: usize) -> Result<(), AssignmentError> {
        if index >= self.rows.len() {
            return Err(AssignmentError::NoSuchRow(index));
        }
        if self.rows.len() == 1 {
            self.errors
                .insert(FORM_ERROR_PATH, AssignmentError::LastRow);
            return Err(AssignmentError::LastRow);
        }
        self.rows.remove(index);
        // Row paths shift; errors are recomputed on the next validation.
        self.errors.clear();
        Ok(())
    }

    /// Choose the role of a row.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::DuplicateRole` when another row already has
    /// the role; the row keeps its previous role.
    pub fn set_role(&mut self, index: usize, role_id: Option<RoleId>) -> Result<(), AssignmentError> {
        let path = format!("{index}.role_id");
        let duplicate = role_id.is_some()
            && self
                .rows
                .iter()
                .enumerate()
                .any(|(i, row)| i != index && row.role_id == role_id);
        if duplicate {
            self.errors.insert(path, AssignmentError::DuplicateRole);
            return Err(AssignmentError::DuplicateRole);
        }
        self.row_mut(index)?.role_id = role_id;
        self.errors.remove(&path);
        Ok(())
    }

    /// Add or remove a location, returning whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::NoSuchRow` for an unknown index.
    pub fn toggle_location(
        &mut self,
        index: usize,
        location_id: LocationId,
    ) -> Result<bool, AssignmentError> {
        let row = self.row_mut(index)?;
        let selected = if row.location_ids.remove(&location_id) {
            false
        } else {
            row.location_ids.insert(location_id);
            true
        };
        if selected {
            self.errors.remove(&format!("{index}.location_ids"));
        }
        Ok(selected)
    }

    /// Roles offered for row `index`: those the acting user may grant, minus
    /// the roles chosen in other rows.
    #[must_use]
    pub fn available_roles(&self, index: usize, catalog: &[Role]) -> Vec<Role> {
        let taken: BTreeSet<RoleId> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .filter_map(|(_, row)| row.role_id)
            .collect();
        grantable_roles(catalog, self.tier)
            .into_iter()
            .filter(|role| !taken.contains(&role.id))
            .collect()
    }

    /// Check every row: a role, at least one location, no repeated role.
    ///
    /// # Errors
    ///
    /// Returns the errors, which are also kept for display.
    pub fn validate(&mut self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut seen = BTreeSet::new();
        for (index, row) in self.rows.iter().enumerate() {
            match row.role_id {
                None => errors.insert(format!("{index}.role_id"), ValidationError::Required),
                Some(role_id) if !seen.insert(role_id) => {
                    errors.insert(format!("{index}.role_id"), AssignmentError::DuplicateRole);
                }
                Some(_) => {}
            }
            if row.location_ids.is_empty() {
                errors.insert(
                    format!("{index}.location_ids"),
                    ValidationError::Other("Selecione ao menos uma unidade".to_owned()),
                );
            }
        }
        self.errors = errors.clone();
        errors.into_result()
    }

    /// Validate and flatten into the request payload.
    ///
    /// # Errors
    ///
    /// Returns the validation errors; nothing should be sent.
    pub fn to_payload(&mut self) -> Result<Vec<AssignmentPair>, FieldErrors> {
        self.validate()?;
        let pairs: Vec<AssignmentPair> = self
            .rows
            .iter()
            .filter_map(|row| row.role_id.map(|role_id| (role_id, &row.location_ids)))
            .flat_map(|(role_id, locations)| {
                locations
                    .iter()
                    .map(move |&location_id| AssignmentPair {
                        role_id,
                        location_id,
                    })
            })
            .collect();
        validate_assignment_pairs(&pairs)?;
        Ok(pairs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::Utc;
    use tavola_core::{LoginName, RoleAssignment, RoleName, UserId, UserStatus};

    fn role(id: i32, name: RoleName, level: i32) -> Role {
        Role {
            id: RoleId::new(id),
            name,
            display_name: name.to_string(),
            level,
        }
    }

    fn catalog() -> Vec<Role> {
        vec![
            role(1, RoleName::SuperAdmin, 0),
            role(2, RoleName::RestaurantAdministrator, 10),
            role(3, RoleName::LocationAdministrator, 20),
            role(4, RoleName::Waiter, 40),
        ]
    }

    fn names(roles: &[Role]) -> Vec<i32> {
        roles.iter().map(|r| r.id.as_i32()).collect()
    }

    #[test]
    fn test_last_row_cannot_be_removed() {
        let mut form = AssignmentForm::new(ActorTier::RestaurantAdmin);
        assert_eq!(form.remove_row(0), Err(AssignmentError::LastRow));
        assert_eq!(form.rows().len(), 1);
        assert!(form.errors().get(FORM_ERROR_PATH).is_some());

        form.add_row();
        assert!(form.errors().get(FORM_ERROR_PATH).is_none());
        form.remove_row(0).unwrap();
        assert_eq!(form.rows().len(), 1);
    }

    #[test]
    fn test_role_cannot_repeat_across_rows() {
        let mut form = AssignmentForm::new(ActorTier::RestaurantAdmin);
        form.set_role(0, Some(RoleId::new(3))).unwrap();
        let second = form.add_row();

        assert_eq!(
            form.set_role(second, Some(RoleId::new(3))),
            Err(AssignmentError::DuplicateRole)
        );
        assert_eq!(form.rows()[second].role_id, None);
        assert!(form.errors().get("1.role_id").is_some());

        form.set_role(second, Some(RoleId::new(4))).unwrap();
        assert!(form.errors().get("1.role_id").is_none());
    }

    #[test]
    fn test_available_roles_follow_tier_and_other_rows() {
        let mut form = AssignmentForm::new(ActorTier::RestaurantAdmin);
        form.set_role(0, Some(RoleId::new(3))).unwrap();
        form.add_row();

        assert_eq!(names(&form.available_roles(0, &catalog())), vec![2, 3, 4]);
        assert_eq!(names(&form.available_roles(1, &catalog())), vec![2, 4]);

        let staff = AssignmentForm::new(ActorTier::Staff);
        assert_eq!(names(&staff.available_roles(0, &catalog())), vec![3, 4]);

        let root = AssignmentForm::new(ActorTier::SuperAdmin);
        assert_eq!(names(&root.available_roles(0, &catalog())), vec![2, 3, 4]);
    }

    #[test]
    fn test_incomplete_rows_block_submit() {
        let mut form = AssignmentForm::new(ActorTier::RestaurantAdmin);
        form.set_role(0, Some(RoleId::new(4))).unwrap();
        form.add_row();
        form.toggle_location(1, LocationId::new(7)).unwrap();

        let errors = form.to_payload().unwrap_err();
        assert!(errors.get("0.location_ids").is_some());
        assert_eq!(errors.get("1.role_id"), Some("Campo obrigatório"));
    }

    #[test]
    fn test_payload_has_one_pair_per_location_per_role() {
        let mut form = AssignmentForm::new(ActorTier::RestaurantAdmin);
        form.set_role(0, Some(RoleId::new(3))).unwrap();
        form.toggle_location(0, LocationId::new(1)).unwrap();
        form.toggle_location(0, LocationId::new(2)).unwrap();
        form.add_row();
        form.set_role(1, Some(RoleId::new(4))).unwrap();
        form.toggle_location(1, LocationId::new(2)).unwrap();

        let pairs = form.to_payload().unwrap();
        assert_eq!(
            pairs,
            vec![
                AssignmentPair {
                    role_id: RoleId::new(3),
                    location_id: LocationId::new(1)
                },
                AssignmentPair {
                    role_id: RoleId::new(3),
                    location_id: LocationId::new(2)
                },
                AssignmentPair {
                    role_id: RoleId::new(4),
                    location_id: LocationId::new(2)
                },
            ]
        );
    }

    #[test]
    fn test_toggle_location_twice_deselects() {
        let mut form = AssignmentForm::new(ActorTier::Staff);
        assert!(form.toggle_location(0, LocationId::new(1)).unwrap());
        assert!(!form.toggle_location(0, LocationId::new(1)).unwrap());
        assert!(form.rows()[0].location_ids.is_empty());
        assert_eq!(
            form.toggle_location(3, LocationId::new(1)),
            Err(AssignmentError::NoSuchRow(3))
        );
    }

    #[test]
    fn test_rows_from_existing_user() {
        let assignment = |role: i32, name: RoleName, location: i32| RoleAssignment {
            role_id: RoleId::new(role),
            role_name: name,
            location_id: Some(LocationId::new(location)),
        };
        let user = StaffUser {
            id: UserId::new(9),
            restaurant_id: Some(tavola_core::RestaurantId::new(1)),
            login: LoginName::Username("garcom.ana".to_owned()),
            full_name: "Ana Souza".to_owned(),
            status: UserStatus::Active,
            assignments: vec![
                assignment(4, RoleName::Waiter, 1),
                assignment(3, RoleName::LocationAdministrator, 2),
                assignment(4, RoleName::Waiter, 2),
            ],
            created_at: Utc::now(),
        };

        let form = AssignmentForm::from_user(&user, ActorTier::RestaurantAdmin);
        assert_eq!(form.rows().len(), 2);
        assert_eq!(form.rows()[0].role_id, Some(RoleId::new(4)));
        assert_eq!(
            form.rows()[0].location_ids,
            BTreeSet::from([LocationId::new(1), LocationId::new(2)])
        );
        assert_eq!(form.rows()[1].role_id, Some(RoleId::new(3)));
    }
}
