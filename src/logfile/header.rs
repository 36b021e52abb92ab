//! Log file header block

use chrono::{DateTime, Local};

use crate::calibration::Calibration;
use crate::logfile::{CRLF, DATA_START};

/// Describes one logical channel (axis) of the log
#[derive(Debug, Clone, PartialEq)]
pub struct AxisDescriptor {
    pub label: String,
    pub units: String,
}

impl AxisDescriptor {
    pub fn new(label: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            units: units.into(),
        }
    }

    pub fn time() -> Self {
        Self::new("Time", "us")
    }

    pub fn torque() -> Self {
        Self::new("Torque", "in-lb")
    }
}

/// Session metadata written once at the top of a log file
#[derive(Debug, Clone)]
pub struct LogHeader {
    /// Free-form context line, normally the output path
    pub context: String,
    pub start_time: DateTime<Local>,
    pub calibration: Calibration,
    pub port: u16,
    pub time_axis: AxisDescriptor,
    pub value_axis: AxisDescriptor,
}

impl LogHeader {
    pub fn new(context: impl Into<String>, port: u16, calibration: Calibration) -> Self {
        Self {
            context: context.into(),
            start_time: Local::now(),
            calibration,
            port,
            time_axis: AxisDescriptor::time(),
            value_axis: AxisDescriptor::torque(),
        }
    }

    /// Render the complete header, ending with the `DM_Start=` line
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);

        push_line(&mut out, "DM_TestTitle=");
        push_line(
            &mut out,
            &format!(
                "{}{}Program Start Time: {}",
                self.context,
                CRLF,
                self.start_time.format("%Y-%m-%d %H:%M:%S%.6f")
            ),
        );
        push_line(
            &mut out,
            &format!(
                "Calibration Values: Slope = {}, Y-Intercept = {}",
                format_coefficient(self.calibration.slope),
                format_coefficient(self.calibration.intercept)
            ),
        );
        push_line(&mut out, &format!("Port: {}", self.port));
        push_line(&mut out, "DM_Operator=");
        push_line(&mut out, "DM_NumLogChans=2");
        push_line(&mut out, "DM_NumDataModes=1");

        for (index, axis) in [&self.time_axis, &self.value_axis].into_iter().enumerate() {
            push_axis(&mut out, index + 1, axis);
        }

        push_line(&mut out, DATA_START);
        out
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(CRLF);
}

fn push_axis(out: &mut String, logical_chan: usize, axis: &AxisDescriptor) {
    push_line(out, &format!("DM_LogicalChan={}", logical_chan));
    push_line(out, "DM_ChanType=SEQUENTIAL");
    push_line(out, "DM_ChanName=1");
    push_line(out, "DM_NumDims=2");
    push_line(out, "DM_DataMode=1");
    push_line(out, "DM_DataModeType=TIMHIS");
    push_line(out, "DM_AxisLabel.Dim1=[]");
    push_line(out, &format!("DM_AxisLabel.Dim2={}", axis.label));
    push_line(out, "DM_AxisUnits.Dim1=[]");
    push_line(out, &format!("DM_AxisUnits.Dim2={}", axis.units));
}

/// Coefficients always carry a decimal point ("1.0", not "1")
fn format_coefficient(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> LogHeader {
        LogHeader::new("/data/bridge_a.txt", 5005, Calibration::new(0.25, -3.0))
    }

    #[test]
    fn test_header_layout() {
        let text = header().render();
        let lines: Vec<&str> = text.split(CRLF).collect();

        assert_eq!(lines[0], "DM_TestTitle=");
        assert_eq!(lines[1], "/data/bridge_a.txt");
        assert!(lines[2].starts_with("Program Start Time: "));
        assert_eq!(lines[3], "Calibration Values: Slope = 0.25, Y-Intercept = -3.0");
        assert_eq!(lines[4], "Port: 5005");
        assert_eq!(lines[5], "DM_Operator=");
        assert_eq!(lines[6], "DM_NumLogChans=2");
        assert_eq!(lines[7], "DM_NumDataModes=1");
        assert_eq!(lines[8], "DM_LogicalChan=1");
        assert_eq!(lines[15], "DM_AxisLabel.Dim2=Time");
        assert_eq!(lines[17], "DM_AxisUnits.Dim2=us");
        assert_eq!(lines[18], "DM_LogicalChan=2");
        assert_eq!(lines[25], "DM_AxisLabel.Dim2=Torque");
        assert_eq!(lines[27], "DM_AxisUnits.Dim2=in-lb");
        assert_eq!(lines[28], DATA_START);
        // Trailing CRLF leaves one empty element
        assert_eq!(lines.len(), 30);
        assert_eq!(lines[29], "");
    }

    #[test]
    fn test_no_bare_newlines() {
        let text = header().render();
        assert_eq!(text.matches('\n').count(), text.matches(CRLF).count());
    }

    #[test]
    fn test_format_coefficient() {
        assert_eq!(format_coefficient(1.0), "1.0");
        assert_eq!(format_coefficient(0.0), "0.0");
        assert_eq!(format_coefficient(0.125), "0.125");
        assert_eq!(format_coefficient(-12.5), "-12.5");
    }
}
