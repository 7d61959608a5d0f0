// SPDX-License-Identifier: GPL-3.0-only

//! The `network` command, owned by the Network module.

use clap::Parser;

use installer_types::NetworkDeviceConfiguration;

use super::{push_flag, push_opt, split_csv};

#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "network", no_binary_name = true, disable_help_flag = true)]
pub struct NetworkCommand {
    #[arg(long)]
    pub bootproto: Option<String>,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long)]
    pub hostname: Option<String>,

    #[arg(long)]
    pub ip: Option<String>,

    #[arg(long)]
    pub netmask: Option<String>,

    #[arg(long)]
    pub gateway: Option<String>,

    #[arg(long)]
    pub nameserver: Option<String>,

    #[arg(long)]
    pub onboot: Option<String>,

    #[arg(long)]
    pub activate: bool,

    #[arg(long)]
    pub mtu: Option<u32>,
}

impl NetworkCommand {
    /// Whether this line only names the host.
    pub fn is_hostname_only(&self) -> bool {
        self.hostname.is_some()
            && self.device.is_none()
            && self.bootproto.is_none()
            && self.ip.is_none()
    }

    pub fn to_device_configuration(&self) -> NetworkDeviceConfiguration {
        NetworkDeviceConfiguration {
            device: self.device.clone().unwrap_or_default(),
            connection_uuid: String::new(),
            activate: self.activate,
            on_boot: self
                .onboot
                .as_deref()
                .map(|value| matches!(value, "yes" | "on" | "true"))
                .unwrap_or(true),
            ip_method: self.bootproto.clone().unwrap_or_else(|| "dhcp".into()),
            ip_address: self.ip.clone().unwrap_or_default(),
            netmask: self.netmask.clone().unwrap_or_default(),
            gateway: self.gateway.clone().unwrap_or_default(),
            nameservers: self.nameserver.as_deref().map(split_csv).unwrap_or_default(),
        }
    }

    pub fn emit(&self) -> String {
        let mut out = String::from("network");
        push_opt(&mut out, "bootproto", &self.bootproto);
        push_opt(&mut out, "device", &self.device);
        push_opt(&mut out, "ip", &self.ip);
        push_opt(&mut out, "netmask", &self.netmask);
        push_opt(&mut out, "gateway", &self.gateway);
        push_opt(&mut out, "nameserver", &self.nameserver);
        if let Some(onboot) = &self.onboot {
            out.push_str(&format!(" --onboot={onboot}"));
        }
        push_flag(&mut out, "activate", self.activate);
        if let Some(mtu) = self.mtu {
            out.push_str(&format!(" --mtu={mtu}"));
        }
        push_opt(&mut out, "hostname", &self.hostname);
        out
    }
}
