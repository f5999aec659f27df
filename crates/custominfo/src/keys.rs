//! Custom system information keys used by satprep reports.

/// A custom info key definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDefinition {
    pub label: &'static str,
    pub description: &'static str,
}

const fn key(label: &'static str, description: &'static str) -> KeyDefinition {
    KeyDefinition { label, description }
}

pub const CUSTOM_KEYS: &[KeyDefinition] = &[
    key(
        "SYSTEM_OWNER",
        "Defines the system's owner - this is needed for creating automated maintenance reports",
    ),
    key("SYSTEM_MONITORING", "Defines whether the system is monitored"),
    key(
        "SYSTEM_MONITORING_NOTES",
        "Defines additional notes to the system's monitoring state (e.g. test system)",
    ),
    key("SYSTEM_CLUSTER", "Defines whether the system is part of a cluster"),
    key(
        "SYSTEM_BACKUP_NOTES",
        "Defines additional notes to the system's backup state (e.g. test system)",
    ),
    key("SYSTEM_BACKUP", "Defines whether the system is backed up"),
    key(
        "SYSTEM_ANTIVIR_NOTES",
        "Defines additional notes to the anti-virus state of a system (e.g. anti-virus is implemented using XYZ)",
    ),
    key(
        "SYSTEM_ANTIVIR",
        "Defines whether the system is protected with anti-virus software",
    ),
    key("SYSTEM_PROD", "Defines whether the system is a production host"),
    key("SYSTEM_MONITORING_HOST", "Alternate monitoring server URL"),
    key(
        "SYSTEM_MONITORING_HOST_AUTH",
        "Authentication location for alternate monitoring server",
    ),
    key(
        "SYSTEM_MONITORING_NAME",
        "Defines an alternative monitoring hostname",
    ),
    key(
        "SYSTEM_VIRT_HOST",
        "Alternate virtual host (e.g. ESXi, vCenter) - use libvirt URI",
    ),
    key(
        "SYSTEM_VIRT_HOST_AUTH",
        "Authentication location for alternate virtual host",
    ),
    key(
        "SYSTEM_VIRT_SNAPSHOT",
        "Defines whether the system should be protected by a snapshot",
    ),
    key("SYSTEM_VIRT_VMNAME", "Defines an alternative VM object name"),
];
