use super::*;

mod disclosure_controllers;

const REPORT_HTML: &str = r##"
    <table id="results">
      <tr>
        <td>ok 1 - parses plan</td>
        <td>
          <a id="t1-showlink" href="#" data-query="/tap/detail?test=1">details</a>
          <a id="t1-hidelink" href="#" style="display: none">hide</a>
        </td>
      </tr>
      <tr><td colspan="2"><div id="t1" style="display: none">loading</div></td></tr>
    </table>
"##;
