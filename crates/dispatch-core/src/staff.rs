use serde::{Deserialize, Serialize};

use crate::ids::StaffId;
use crate::phone::Phone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    id: StaffId,
    phone: Phone,
    active: bool,
}

impl StaffMember {
    /// New members join the roster active.
    pub fn new(phone: Phone) -> Self {
        Self {
            id: StaffId::new(),
            phone,
            active: true,
        }
    }

    pub fn from_parts(id: StaffId, phone: Phone, active: bool) -> Self {
        Self { id, phone, active }
    }

    pub fn can_be_notified(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn id(&self) -> &StaffId {
        &self.id
    }

    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
